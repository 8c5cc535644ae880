//! Snap resolution engine.
//!
//! Every pointer move, the [`handler::SnapPointHandler`] asks the object snap,
//! the tracking snap and the workplane snap, in that order, for a candidate
//! point and keeps the first one. Tracking infers alignment axes from the
//! operation's reference point and from points pinned by dwelling over them.

pub mod axis;
pub mod axis_tracking;
pub mod cancellation;
pub mod feature_point;
pub mod handler;
pub mod input;
pub mod object_snap;
pub mod object_tracking;
pub mod tracking_snap;
pub mod workplane_snap;

#[cfg(test)]
mod tests_infrastructure;
#[cfg(test)]
mod tests_tracking;
#[cfg(test)]
mod tests_handler;

pub use axis::Axis;
pub use axis_tracking::AxisTracking;
pub use cancellation::CancellationToken;
pub use feature_point::FeaturePointStrategy;
pub use handler::{Key, PickStatus, PointSnapData, PointerButton, SnapPointHandler};
pub use input::{Dimensions, InputContext, InputError};
pub use object_snap::ObjectSnap;
pub use object_tracking::ObjectTracking;
pub use tracking_snap::TrackingSnap;
pub use workplane_snap::WorkplaneSnap;

use crate::geometry::Point3;
use crate::kernel::ShapeRef;
use crate::view::{View, ViewId};

/// Display labels attached to snap results. The UI localizes them.
pub mod labels {
    pub const END: &str = "snap.end";
    pub const MID: &str = "snap.mid";
    pub const CENTER: &str = "snap.center";
    pub const PERPENDICULAR: &str = "snap.perpendicular";
    pub const INTERSECTION: &str = "snap.intersection";
    pub const VERTEX: &str = "snap.vertex";
    pub const AXIS_X: &str = "axis.x";
    pub const AXIS_Y: &str = "axis.y";
    pub const AXIS_Z: &str = "axis.z";
}

/// A resolved snap candidate.
#[derive(Debug, Clone)]
pub struct SnapResult {
    pub view: ViewId,
    pub point: Point3,
    pub info: Option<String>,
    /// Entities the point was derived from; empty for pure tracking results
    pub shapes: Vec<ShapeRef>,
    pub ref_point: Option<Point3>,
    pub distance: Option<f64>,
}

impl SnapResult {
    pub fn new(view: ViewId, point: Point3) -> Self {
        Self {
            view,
            point,
            info: None,
            shapes: Vec::new(),
            ref_point: None,
            distance: None,
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn with_shapes(mut self, shapes: Vec<ShapeRef>) -> Self {
        self.shapes = shapes;
        self
    }

    /// Same snap as `other`: identical point, label and source shapes.
    pub fn is_same(&self, other: &SnapResult) -> bool {
        self.view == other.view
            && self.point == other.point
            && self.info == other.info
            && self.shapes.len() == other.shapes.len()
            && self.shapes.iter().zip(&other.shapes).all(|(a, b)| a.id == b.id)
    }
}

/// Cursor position plus the shapes detected under it, shared by all snappers
/// for one pointer move.
pub struct PointerState<'a> {
    pub view: &'a dyn View,
    pub x: f64,
    pub y: f64,
    pub shapes: Vec<ShapeRef>,
}

impl<'a> PointerState<'a> {
    pub fn new(view: &'a dyn View, x: f64, y: f64) -> Self {
        let shapes = view.detect_shapes(x, y);
        Self { view, x, y, shapes }
    }

    pub fn screen_distance(&self, point: &Point3) -> f64 {
        self.view.screen_distance(point, self.x, self.y)
    }
}

/// A source of snap candidates.
pub trait Snapper {
    fn snap(&mut self, state: &PointerState<'_>) -> Option<SnapResult>;

    /// Removes the temporary meshes this snapper displayed for `view` during the
    /// last evaluation.
    fn remove_dynamic_object(&mut self, view: ViewId);

    /// Removes every temporary mesh and listener this snapper owns.
    fn clear(&mut self);
}
