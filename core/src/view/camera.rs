//! Reference [`View`] implementation: a pinhole or orthographic camera over a
//! flat list of shapes, with screen-space hit detection.

use super::{DocumentId, View, ViewId};
use crate::geometry::{Point2, Point3, Ray, Vector3, Workplane, EPSILON};
use crate::kernel::{Shape, ShapeRef};
use crate::visual::SharedVisual;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Projection {
    /// `height` world units span the viewport vertically
    Orthographic { height: f64 },
    /// Vertical field of view in radians
    Perspective { fov_y: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub eye: Point3,
    pub target: Point3,
    pub up: Vector3,
    pub projection: Projection,
}

impl Camera {
    /// Orthographic camera looking down -Z at `target`.
    pub fn top(target: Point3, height: f64) -> Self {
        Self {
            eye: target + Vector3::z() * 100.0,
            target,
            up: Vector3::y(),
            projection: Projection::Orthographic { height },
        }
    }

    /// Orthonormal (forward, right, up) frame of the camera.
    pub fn basis(&self) -> (Vector3, Vector3, Vector3) {
        let forward = (self.target - self.eye).try_normalize(EPSILON).unwrap_or_else(|| -Vector3::z());
        let right = forward
            .cross(&self.up)
            .try_normalize(EPSILON)
            .unwrap_or_else(|| forward.cross(&Vector3::x()).normalize());
        let up = right.cross(&forward);
        (forward, right, up)
    }
}

/// Smallest depth used when projecting points close to or behind a pinhole eye.
const NEAR_DEPTH: f64 = 1e-3;

pub struct CameraView {
    id: ViewId,
    document: DocumentId,
    visual: SharedVisual,
    pub camera: Camera,
    pub width: f64,
    pub height: f64,
    pub workplane: Workplane,
    /// Pixel radius for shape detection
    pub detect_tolerance: f64,
    shapes: Vec<ShapeRef>,
}

impl CameraView {
    pub fn new(document: DocumentId, visual: SharedVisual, camera: Camera, width: f64, height: f64) -> Self {
        Self {
            id: ViewId::new(),
            document,
            visual,
            camera,
            width,
            height,
            workplane: Workplane::xy(),
            detect_tolerance: 5.0,
            shapes: Vec::new(),
        }
    }

    pub fn add_shape(&mut self, shape: ShapeRef) {
        self.shapes.push(shape);
    }

    pub fn clear_shapes(&mut self) {
        self.shapes.clear();
    }

    pub fn shapes(&self) -> &[ShapeRef] {
        &self.shapes
    }

    /// Orthographic pixels per world unit, or the pinhole focal length in pixels.
    fn scale(&self) -> f64 {
        match self.camera.projection {
            Projection::Orthographic { height } => self.height / height,
            Projection::Perspective { fov_y } => (self.height / 2.0) / (fov_y / 2.0).tan(),
        }
    }
}

fn point_segment_distance(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < EPSILON * EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

impl View for CameraView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn document(&self) -> DocumentId {
        self.document
    }

    fn visual(&self) -> SharedVisual {
        self.visual.clone()
    }

    fn workplane(&self) -> Workplane {
        self.workplane
    }

    fn ray_at(&self, x: f64, y: f64) -> Ray {
        let (forward, right, up) = self.camera.basis();
        let (dx, dy) = (x - self.width / 2.0, self.height / 2.0 - y);
        let scale = self.scale();
        match self.camera.projection {
            Projection::Orthographic { .. } => {
                Ray::new(self.camera.eye + right * (dx / scale) + up * (dy / scale), forward)
            }
            Projection::Perspective { .. } => {
                Ray::new(self.camera.eye, forward * scale + right * dx + up * dy)
            }
        }
    }

    fn world_to_screen(&self, point: &Point3) -> Point2 {
        let (forward, right, up) = self.camera.basis();
        let scale = self.scale();
        let (u, v) = match self.camera.projection {
            Projection::Orthographic { .. } => {
                let r = point - self.camera.target;
                (r.dot(&right) * scale, r.dot(&up) * scale)
            }
            Projection::Perspective { .. } => {
                let r = point - self.camera.eye;
                let depth = r.dot(&forward).max(NEAR_DEPTH);
                (r.dot(&right) * scale / depth, r.dot(&up) * scale / depth)
            }
        };
        Point2::new(self.width / 2.0 + u, self.height / 2.0 - v)
    }

    fn direction(&self) -> Vector3 {
        self.camera.basis().0
    }

    fn up(&self) -> Vector3 {
        self.camera.basis().2
    }

    fn detect_shapes(&self, x: f64, y: f64) -> Vec<ShapeRef> {
        let cursor = Point2::new(x, y);
        let mut hits: Vec<(u8, f64, &ShapeRef)> = Vec::new();

        for shape in &self.shapes {
            let (rank, distance) = match shape.shape.as_ref() {
                Shape::Vertex(_) => {
                    let Some(point) = shape.discretize().first().copied() else {
                        continue;
                    };
                    (0, (self.world_to_screen(&point) - cursor).norm())
                }
                Shape::Edge(_) => {
                    let screen: Vec<Point2> = shape.discretize().iter().map(|p| self.world_to_screen(p)).collect();
                    let distance = screen
                        .windows(2)
                        .map(|w| point_segment_distance(&cursor, &w[0], &w[1]))
                        .fold(f64::INFINITY, f64::min);
                    (1, distance)
                }
                // Faces are picked through their boundary edges
                Shape::Face(_) => continue,
            };
            if distance <= self.detect_tolerance {
                hits.push((rank, distance, shape));
            }
        }

        hits.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)));
        hits.into_iter().map(|(_, _, shape)| shape.clone()).collect()
    }
}
