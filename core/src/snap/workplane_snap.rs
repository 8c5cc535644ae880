use super::{PointerState, SnapResult, Snapper};
use crate::geometry::{ray_plane_intersect, Workplane};
use crate::view::ViewId;

/// Fallback snapper: the cursor ray hitting the active plane.
#[derive(Debug, Default, Clone)]
pub struct WorkplaneSnap {
    /// Operation plane; the view workplane is used when unset
    plane: Option<Workplane>,
}

impl WorkplaneSnap {
    pub fn new(plane: Option<Workplane>) -> Self {
        Self { plane }
    }
}

impl Snapper for WorkplaneSnap {
    fn snap(&mut self, state: &PointerState<'_>) -> Option<SnapResult> {
        let plane = self.plane.unwrap_or_else(|| state.view.workplane());
        let ray = state.view.ray_at(state.x, state.y);
        let (_, point) = ray_plane_intersect(&ray, &plane.plane())?;
        Some(SnapResult::new(state.view.id(), point))
    }

    fn remove_dynamic_object(&mut self, _view: ViewId) {}

    fn clear(&mut self) {}
}
