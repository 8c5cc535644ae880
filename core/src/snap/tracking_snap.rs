use super::object_tracking::ObjectTracking;
use super::{labels, Axis, AxisTracking, PointerState, SnapResult, Snapper};
use crate::config::{SettingsWatch, SnapSettings};
use crate::geometry::{Point2, Point3, EPSILON};
use crate::kernel::ShapeType;
use crate::view::{View, ViewId};
use crate::visual::{MeshData, OwnedMeshes};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Length of the sample segment projected to measure screen distance to an axis.
const AXIS_PROBE_LENGTH: f64 = 1e5;
/// Guide lines for a single axis extend this many times the snapped distance.
const GUIDE_EXTENSION: f64 = 1e10;
/// Upper bound on drawn guide length; mesh generation never sees infinities.
pub const MAX_GUIDE_LENGTH: f64 = 1e20;

/// An axis that passed the screen-distance test for the current cursor.
#[derive(Debug, Clone)]
struct TrackingData {
    axis: Axis,
    /// Point on the axis nearest to the cursor ray
    point: Point3,
    is_object_tracking: bool,
    /// Screen distance in pixels
    distance: f64,
    info: String,
}

/// Perpendicular screen distance from the cursor to the projected axis line.
/// Axes seen end-on fall back to the distance to their projected origin.
pub fn screen_distance_to_axis(view: &dyn View, axis: &Axis, x: f64, y: f64) -> f64 {
    let start = view.world_to_screen(&axis.location);
    let end = view.world_to_screen(&(axis.location + axis.direction * AXIS_PROBE_LENGTH));
    let cursor = Point2::new(x, y);
    let v = cursor - start;

    let segment = end - start;
    let length = segment.norm();
    if length < EPSILON {
        return v.norm();
    }

    let along = v.dot(&(segment / length));
    (v.norm_squared() - along * along).max(0.0).sqrt()
}

/// Snaps to alignment axes from the reference point and from pinned
/// object-tracking points, preferring axis/edge and axis/axis intersections.
pub struct TrackingSnap {
    settings: Arc<SnapSettings>,
    watch: Option<SettingsWatch>,
    reference_point: Option<Point3>,
    axis_tracking: AxisTracking,
    object_tracking: ObjectTracking,
    guides: HashMap<ViewId, OwnedMeshes>,
}

impl TrackingSnap {
    pub fn new(settings: Arc<SnapSettings>, reference_point: Option<Point3>, track_z: bool) -> Self {
        let dwell = Duration::from_millis(settings.snapshot().dwell_millis);
        let watch = settings.watch();
        Self {
            settings,
            watch: Some(watch),
            reference_point,
            axis_tracking: AxisTracking::new(track_z),
            object_tracking: ObjectTracking::new(track_z, dwell),
            guides: HashMap::new(),
        }
    }

    pub fn reference_point(&self) -> Option<Point3> {
        self.reference_point
    }

    pub fn object_tracking(&self) -> &ObjectTracking {
        &self.object_tracking
    }

    pub fn object_tracking_mut(&mut self) -> &mut ObjectTracking {
        &mut self.object_tracking
    }

    /// Feeds the current object snap to the dwell-to-track logic.
    /// With tracking disabled nothing is pinned: the snap is treated as absent,
    /// which also cancels a pending dwell.
    pub fn show_tracking_at_timeout(&mut self, view: &dyn View, snap: Option<&SnapResult>, now: Instant) {
        self.sync_settings();
        let snap = snap.filter(|_| self.settings.tracking_enabled());
        self.object_tracking.show_tracking_at_timeout(view, snap, now);
    }

    /// Applies pending settings changes and fires a due dwell timer.
    pub fn poll(&mut self, now: Instant) {
        self.sync_settings();
        self.object_tracking.poll(now);
    }

    /// Number of guide meshes currently displayed for `view`.
    pub fn guide_count(&self, view: ViewId) -> usize {
        self.guides.get(&view).map_or(0, OwnedMeshes::len)
    }

    fn sync_settings(&mut self) {
        let changed = self.watch.as_ref().is_some_and(SettingsWatch::take_changed);
        if changed {
            debug!("Snap settings changed, resetting tracking");
            self.axis_tracking.clear();
            self.object_tracking.clear();
        }
    }

    fn guides_for(&mut self, view: &dyn View) -> &mut OwnedMeshes {
        self.guides
            .entry(view.id())
            .or_insert_with(|| OwnedMeshes::new(view.visual()))
    }

    fn collect_candidates(&mut self, state: &PointerState<'_>) -> Vec<TrackingData> {
        let view = state.view;
        let ray = view.ray_at(state.x, state.y);
        let settings = &self.settings;
        let mut candidates = Vec::new();

        let push_axes = |axes: &[Axis], is_object_tracking: bool, candidates: &mut Vec<TrackingData>| {
            for axis in axes {
                let distance = screen_distance_to_axis(view, axis, state.x, state.y);
                if !settings.within_snap_distance(distance) {
                    continue;
                }
                let point = axis.nearest_point_to(&ray);
                // Each direction of the fan is a half-line
                if axis.parameter_of(&point) < -EPSILON {
                    continue;
                }
                candidates.push(TrackingData {
                    axis: axis.clone(),
                    point,
                    is_object_tracking,
                    distance,
                    info: axis.name.clone(),
                });
            }
        };

        if let Some(reference) = self.reference_point {
            let polar = self.settings.polar_angle();
            let axes = self.axis_tracking.get_axes(view.id(), &view.workplane(), reference, polar);
            push_axes(axes, false, &mut candidates);
        }
        for rays in self.object_tracking.get_tracking_rays(view.document()) {
            trace!("Testing tracking rays of {:?}", rays.object_name);
            push_axes(&rays.axes, true, &mut candidates);
        }

        candidates
    }

    /// Intersection of the hovered edge with the candidate axes, closest to the
    /// cursor on screen.
    fn snap_to_hovered_edge(&mut self, state: &PointerState<'_>, candidates: &[TrackingData]) -> Option<SnapResult> {
        let edge = state.shapes.iter().find(|s| s.shape_type() == ShapeType::Edge)?;

        let mut best: Option<(f64, Point3, &TrackingData)> = None;
        for candidate in candidates {
            for point in edge.intersect_line(&candidate.axis.line()) {
                let distance = state.screen_distance(&point);
                if best.map_or(true, |(closest, _, _)| distance < closest) {
                    best = Some((distance, point, candidate));
                }
            }
        }
        let (_, point, candidate) = best?;

        let location = candidate.axis.location;
        self.guides_for(state.view).display(MeshData::dashed_line(location, point));
        Some(SnapResult {
            view: state.view.id(),
            point,
            info: Some(labels::INTERSECTION.to_string()),
            shapes: vec![edge.clone()],
            ref_point: Some(location),
            distance: Some((point - location).norm()),
        })
    }

    fn snap_to_intersection(&mut self, view: &dyn View, point: Point3, first: &TrackingData, second: &TrackingData) -> SnapResult {
        let guides = self.guides_for(view);
        guides.display(MeshData::dashed_line(first.axis.location, point));
        guides.display(MeshData::dashed_line(second.axis.location, point));
        SnapResult::new(view.id(), point).with_info(labels::INTERSECTION)
    }

    fn snap_to_axis(&mut self, view: &dyn View, data: &TrackingData) -> SnapResult {
        let location = data.axis.location;
        let distance = (data.point - location).norm();
        let length = (distance.max(1.0) * GUIDE_EXTENSION).min(MAX_GUIDE_LENGTH);
        let end = location + data.axis.direction * length;
        self.guides_for(view).display(MeshData::dashed_line(location, end));
        SnapResult {
            view: view.id(),
            point: data.point,
            info: Some(data.info.clone()),
            shapes: Vec::new(),
            ref_point: Some(location),
            distance: Some(distance),
        }
    }
}

impl Snapper for TrackingSnap {
    fn snap(&mut self, state: &PointerState<'_>) -> Option<SnapResult> {
        self.sync_settings();
        self.remove_dynamic_object(state.view.id());
        if !self.settings.tracking_enabled() {
            return None;
        }

        let mut candidates = self.collect_candidates(state);
        if candidates.is_empty() {
            return None;
        }
        // Stable: on equal distance reference-point axes stay ahead
        candidates.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        trace!(
            "{} tracking candidates, closest {} at {:.2}px (object tracking: {})",
            candidates.len(),
            candidates[0].info,
            candidates[0].distance,
            candidates[0].is_object_tracking
        );

        if let Some(result) = self.snap_to_hovered_edge(state, &candidates) {
            return Some(result);
        }

        // Only the two closest axes are tried
        if let [first, second, ..] = candidates.as_slice() {
            if let Some(point) = first.axis.intersect(&second.axis) {
                return Some(self.snap_to_intersection(state.view, point, first, second));
            }
        }

        Some(self.snap_to_axis(state.view, &candidates[0]))
    }

    fn remove_dynamic_object(&mut self, view: ViewId) {
        if let Some(guides) = self.guides.get_mut(&view) {
            guides.remove_all();
        }
    }

    fn clear(&mut self) {
        for guides in self.guides.values_mut() {
            guides.remove_all();
        }
        self.guides.clear();
        self.axis_tracking.clear();
        self.object_tracking.clear();
        if let Some(watch) = self.watch.take() {
            self.settings.unsubscribe(watch.id());
        }
    }
}

impl Drop for TrackingSnap {
    fn drop(&mut self) {
        self.clear();
    }
}
