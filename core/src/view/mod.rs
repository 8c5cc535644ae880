//! The view interface snappers query: picking rays, projection to screen
//! space, the active workplane and shape detection under the cursor.

pub mod camera;

pub use camera::{Camera, CameraView, Projection};

use crate::geometry::{Point2, Point3, Ray, Vector3, Workplane};
use crate::kernel::ShapeRef;
use crate::visual::SharedVisual;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub Uuid);

impl ViewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 3D viewport of a document. Screen coordinates are pixels with the origin
/// at the top-left corner.
pub trait View {
    fn id(&self) -> ViewId;

    fn document(&self) -> DocumentId;

    /// Visual context of the view's document.
    fn visual(&self) -> SharedVisual;

    fn workplane(&self) -> Workplane;

    /// Picking ray through the given screen position.
    fn ray_at(&self, x: f64, y: f64) -> Ray;

    fn world_to_screen(&self, point: &Point3) -> Point2;

    /// Viewing direction, from the eye into the scene.
    fn direction(&self) -> Vector3;

    fn up(&self) -> Vector3;

    /// Vertices and edges under the cursor, most relevant first.
    fn detect_shapes(&self, x: f64, y: f64) -> Vec<ShapeRef>;

    fn screen_distance(&self, point: &Point3, x: f64, y: f64) -> f64 {
        let screen = self.world_to_screen(point);
        ((screen.x - x).powi(2) + (screen.y - y).powi(2)).sqrt()
    }
}
