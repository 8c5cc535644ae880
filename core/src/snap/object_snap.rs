use super::{labels, FeaturePointStrategy, PointerState, SnapResult, Snapper};
use crate::config::{SettingsWatch, SnapSettings, SnapType};
use crate::geometry::Point3;
use crate::kernel::{ShapeId, ShapeRef, ShapeType};
use crate::view::ViewId;
use crate::visual::{MeshData, OwnedMeshes, PointStyle};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Center of a hovered circular edge. The center stays a snap candidate
/// after the cursor leaves the edge so it can be reached.
struct CenterHint {
    view: ViewId,
    center: Point3,
    shape: ShapeRef,
    marker: OwnedMeshes,
}

/// Snaps to geometric features of the shapes under the cursor: endpoints,
/// midpoints, vertices, circle centers, perpendicular feet and edge/edge
/// intersections.
pub struct ObjectSnap {
    settings: Arc<SnapSettings>,
    watch: Option<SettingsWatch>,
    reference_point: Option<Point3>,
    strategy: FeaturePointStrategy,
    hints: HashMap<ShapeId, CenterHint>,
}

impl ObjectSnap {
    pub fn new(settings: Arc<SnapSettings>, reference_point: Option<Point3>) -> Self {
        let strategy = FeaturePointStrategy::new(settings.snap_types());
        let watch = settings.watch();
        Self {
            settings,
            watch: Some(watch),
            reference_point,
            strategy,
            hints: HashMap::new(),
        }
    }

    pub fn strategy(&self) -> &FeaturePointStrategy {
        &self.strategy
    }

    pub fn hint_count(&self) -> usize {
        self.hints.len()
    }

    fn sync_settings(&mut self) {
        let changed = self.watch.as_ref().is_some_and(SettingsWatch::take_changed);
        if changed {
            debug!("Snap types changed, dropping feature point cache");
            self.strategy.update_snap_type(self.settings.snap_types());
        }
    }

    /// Registers the centers of hovered circular edges and draws a hint
    /// marker the first time each one is seen.
    fn remember_centers(&mut self, state: &PointerState<'_>) {
        for shape in &state.shapes {
            if self.hints.contains_key(&shape.id) {
                continue;
            }
            let Some(center) = shape.center() else {
                continue;
            };
            let mut marker = OwnedMeshes::new(state.view.visual());
            marker.display(MeshData::point(center, PointStyle::Hint));
            self.hints.insert(
                shape.id,
                CenterHint {
                    view: state.view.id(),
                    center,
                    shape: shape.clone(),
                    marker,
                },
            );
        }
    }

    fn center_candidates(&self, view: ViewId) -> impl Iterator<Item = SnapResult> + '_ {
        self.hints.values().filter(move |hint| hint.view == view).map(move |hint| {
            SnapResult::new(view, hint.center)
                .with_info(labels::CENTER)
                .with_shapes(vec![hint.shape.clone()])
        })
    }

    fn perpendicular_candidate(&self, state: &PointerState<'_>) -> Option<SnapResult> {
        let reference = self.reference_point?;
        let edge = state.shapes.iter().find(|s| s.shape_type() == ShapeType::Edge)?;
        let foot = edge.perpendicular_foot(&reference)?;
        let mut result = SnapResult::new(state.view.id(), foot)
            .with_info(labels::PERPENDICULAR)
            .with_shapes(vec![edge.clone()]);
        result.ref_point = Some(reference);
        Some(result)
    }

    fn intersection_candidates(state: &PointerState<'_>) -> Vec<SnapResult> {
        let edges: Vec<&ShapeRef> = state
            .shapes
            .iter()
            .filter(|s| s.shape_type() == ShapeType::Edge)
            .collect();

        let mut results = Vec::new();
        for (i, a) in edges.iter().enumerate() {
            for b in &edges[i + 1..] {
                for point in a.intersect(b) {
                    results.push(
                        SnapResult::new(state.view.id(), point)
                            .with_info(labels::INTERSECTION)
                            .with_shapes(vec![(*a).clone(), (*b).clone()]),
                    );
                }
            }
        }
        results
    }
}

impl Snapper for ObjectSnap {
    fn snap(&mut self, state: &PointerState<'_>) -> Option<SnapResult> {
        self.sync_settings();
        if !self.settings.snap_enabled() {
            return None;
        }

        let view = state.view.id();
        let snap_types = self.strategy.snap_types();
        let mut candidates = Vec::new();

        if let Some(shape) = state.shapes.first() {
            candidates.extend(self.strategy.get_feature_points(view, shape));
        }
        if snap_types.contains(SnapType::Center) {
            self.remember_centers(state);
            candidates.extend(self.center_candidates(view));
        }
        if snap_types.contains(SnapType::Perpendicular) {
            candidates.extend(self.perpendicular_candidate(state));
        }
        if snap_types.contains(SnapType::Intersection) {
            candidates.extend(Self::intersection_candidates(state));
        }

        let best = candidates
            .into_iter()
            .map(|candidate| (state.screen_distance(&candidate.point), candidate))
            .filter(|(distance, _)| self.settings.within_snap_distance(*distance))
            .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, candidate)| candidate);

        if let Some(result) = &best {
            trace!("Object snap {:?} at {:?}", result.info, result.point);
        }
        best
    }

    // Center hints stay visible until the pick finishes.
    fn remove_dynamic_object(&mut self, _view: ViewId) {}

    fn clear(&mut self) {
        for hint in self.hints.values_mut() {
            hint.marker.remove_all();
        }
        self.hints.clear();
        self.strategy.clear();
        if let Some(watch) = self.watch.take() {
            self.settings.unsubscribe(watch.id());
        }
    }
}

impl Drop for ObjectSnap {
    fn drop(&mut self) {
        self.clear();
    }
}
