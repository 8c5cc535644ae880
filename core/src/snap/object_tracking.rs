use super::{Axis, SnapResult};
use crate::geometry::{ApproxEq, Workplane};
use crate::view::{DocumentId, View};
use crate::visual::{with_visual, MeshData, PointStyle, SharedVisual, TempMeshId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(u64);

/// One-shot cancellable timer driven by the caller's clock. Each schedule
/// invalidates the previous handle.
#[derive(Debug, Default)]
pub struct DwellTimer {
    next: u64,
    pending: Option<(TimerHandle, Instant)>,
}

impl DwellTimer {
    pub fn schedule(&mut self, deadline: Instant) -> TimerHandle {
        self.next += 1;
        let handle = TimerHandle(self.next);
        self.pending = Some((handle, deadline));
        handle
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fires the pending timer if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<TimerHandle> {
        match self.pending {
            Some((handle, deadline)) if now >= deadline => {
                self.pending = None;
                Some(handle)
            }
            _ => None,
        }
    }
}

/// Alignment axes radiating from one pinned point.
#[derive(Debug, Clone)]
pub struct TrackingRays {
    pub axes: Vec<Axis>,
    pub object_name: Option<String>,
}

#[derive(Debug)]
struct TrackedPoint {
    snap: SnapResult,
    marker: TempMeshId,
    axes: Vec<Axis>,
}

struct DocumentTracking {
    visual: SharedVisual,
    points: Vec<TrackedPoint>,
}

/// Everything a timer fire needs, captured when the dwell starts.
struct PendingPin {
    handle: TimerHandle,
    document: DocumentId,
    visual: SharedVisual,
    workplane: Workplane,
    snap: SnapResult,
}

/// Pins snap points the cursor dwells on and exposes their axis fans as
/// tracking sources. Dwelling again on a pinned point unpins it.
pub struct ObjectTracking {
    track_z: bool,
    dwell: Duration,
    timer: DwellTimer,
    pending: Option<PendingPin>,
    last: Option<SnapResult>,
    trackings: HashMap<DocumentId, DocumentTracking>,
    is_cleared: bool,
}

impl ObjectTracking {
    pub fn new(track_z: bool, dwell: Duration) -> Self {
        Self {
            track_z,
            dwell,
            timer: DwellTimer::default(),
            pending: None,
            last: None,
            trackings: HashMap::new(),
            is_cleared: false,
        }
    }

    /// Called on every pointer move with the current object snap. Restarts the
    /// dwell timer whenever the snap differs from the previous call.
    pub fn show_tracking_at_timeout(&mut self, view: &dyn View, snap: Option<&SnapResult>, now: Instant) {
        let unchanged = match (&self.last, snap) {
            (None, None) => true,
            (Some(last), Some(snap)) => last.is_same(snap),
            _ => false,
        };
        if unchanged {
            return;
        }

        self.last = snap.cloned();
        self.timer.cancel();
        self.pending = None;

        if let Some(snap) = snap {
            self.is_cleared = false;
            let handle = self.timer.schedule(now + self.dwell);
            self.pending = Some(PendingPin {
                handle,
                document: view.document(),
                visual: view.visual(),
                workplane: view.workplane(),
                snap: snap.clone(),
            });
        }
    }

    /// Fires the dwell timer if it is due.
    pub fn poll(&mut self, now: Instant) {
        let Some(fired) = self.timer.poll(now) else {
            return;
        };
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.handle != fired {
            return;
        }
        self.toggle(pending.document, &pending.visual, &pending.workplane, &pending.snap);
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// Pins `snap` for the view's document, or unpins it if a point with the
    /// same coordinates is already pinned.
    pub fn toggle_point(&mut self, view: &dyn View, snap: &SnapResult) {
        self.toggle(view.document(), &view.visual(), &view.workplane(), snap);
    }

    fn toggle(&mut self, document: DocumentId, visual: &SharedVisual, workplane: &Workplane, snap: &SnapResult) {
        if self.is_cleared {
            return;
        }

        let tracking = self.trackings.entry(document).or_insert_with(|| DocumentTracking {
            visual: visual.clone(),
            points: Vec::new(),
        });

        if let Some(index) = tracking.points.iter().position(|p| p.snap.point.approx_eq(&snap.point)) {
            let removed = tracking.points.remove(index);
            with_visual(&tracking.visual, |ctx| ctx.remove_temporary_mesh(removed.marker));
            debug!("Unpinned tracking point {:?}", removed.snap.point);
            return;
        }

        let marker = with_visual(&tracking.visual, |ctx| {
            ctx.display_temporary_mesh(MeshData::point(snap.point, PointStyle::Tracked))
        });
        let axes = Axis::axes_at_plane(snap.point, workplane, self.track_z);
        tracking.points.push(TrackedPoint {
            snap: snap.clone(),
            marker,
            axes,
        });
        debug!("Pinned tracking point {:?}", snap.point);
    }

    pub fn get_tracking_rays(&self, document: DocumentId) -> Vec<TrackingRays> {
        self.trackings
            .get(&document)
            .map(|tracking| {
                tracking
                    .points
                    .iter()
                    .map(|p| TrackingRays {
                        axes: p.axes.clone(),
                        object_name: p.snap.info.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn tracked_count(&self, document: DocumentId) -> usize {
        self.trackings.get(&document).map_or(0, |t| t.points.len())
    }

    /// Cancels the dwell timer and unpins every point in every document.
    /// Timer fires arriving afterwards are ignored until a new dwell starts.
    pub fn clear(&mut self) {
        self.is_cleared = true;
        self.timer.cancel();
        self.pending = None;
        self.last = None;
        for tracking in self.trackings.values() {
            with_visual(&tracking.visual, |ctx| {
                for point in &tracking.points {
                    ctx.remove_temporary_mesh(point.marker);
                }
            });
        }
        self.trackings.clear();
    }
}
