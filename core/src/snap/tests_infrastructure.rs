//! Shared fixtures: an 800x600 orthographic top view spanning 60 units
//! vertically, i.e. 10 px per unit with the world origin at pixel (400, 300).

use crate::config::{SnapConfig, SnapSettings};
use crate::geometry::Point3;
use crate::kernel::{Edge, LineCurve, Shape, ShapeId, ShapeRef};
use crate::view::{Camera, CameraView, DocumentId, View};
use crate::visual::{SharedVisual, TemporaryMeshes};
use std::sync::{Arc, Mutex};

pub(crate) struct TestScene {
    pub document: DocumentId,
    pub meshes: Arc<Mutex<TemporaryMeshes>>,
    pub settings: Arc<SnapSettings>,
}

impl TestScene {
    pub fn new() -> Self {
        Self::with_config(SnapConfig::default())
    }

    pub fn with_config(config: SnapConfig) -> Self {
        Self {
            document: DocumentId::new(),
            meshes: TemporaryMeshes::shared(),
            settings: SnapSettings::shared(config),
        }
    }

    pub fn visual(&self) -> SharedVisual {
        self.meshes.clone()
    }

    pub fn active_meshes(&self) -> usize {
        self.meshes.lock().unwrap().active_count()
    }
}

pub(crate) fn top_view(scene: &TestScene) -> CameraView {
    CameraView::new(scene.document, scene.visual(), Camera::top(Point3::origin(), 60.0), 800.0, 600.0)
}

/// Pixel position of a point on the z = 0 plane.
pub(crate) fn px(x: f64, y: f64) -> (f64, f64) {
    (400.0 + 10.0 * x, 300.0 - 10.0 * y)
}

pub(crate) fn line_edge(seed: &str, start: Point3, end: Point3) -> ShapeRef {
    ShapeRef::new(
        ShapeId::new_deterministic(seed),
        Shape::Edge(Edge::new(LineCurve::new(start, end))),
    )
}

#[test]
fn test_top_view_pixel_mapping() {
    let scene = TestScene::new();
    let view = top_view(&scene);
    let screen = view.world_to_screen(&Point3::new(2.0, 3.0, 0.0));
    assert!((screen.x - 420.0).abs() < 1e-9);
    assert!((screen.y - 270.0).abs() < 1e-9);
    assert_eq!(px(2.0, 3.0), (420.0, 270.0));

    // Depth does not move an orthographic projection
    let lifted = view.world_to_screen(&Point3::new(2.0, 3.0, 7.0));
    assert!((lifted.x - 420.0).abs() < 1e-9);
}

#[test]
fn test_detection_prefers_vertices() {
    let scene = TestScene::new();
    let mut view = top_view(&scene);
    view.add_shape(line_edge("edge", Point3::origin(), Point3::new(10.0, 0.0, 0.0)));
    view.add_shape(ShapeRef::new(ShapeId::new_deterministic("vertex"), Shape::Vertex(Point3::new(5.0, 0.2, 0.0))));

    let (x, y) = px(5.0, 0.1);
    let shapes = view.detect_shapes(x, y);
    assert_eq!(shapes.len(), 2);
    assert_eq!(shapes[0].id, ShapeId::new_deterministic("vertex"));

    let (x, y) = px(5.0, 3.0);
    assert!(view.detect_shapes(x, y).is_empty());
}
