use nalgebra as na;
use thiserror::Error;

pub type Point2 = na::Point2<f64>;
pub type Point3 = na::Point3<f64>;
pub type Vector3 = na::Vector3<f64>;
pub type Transform3 = na::Isometry3<f64>;

/// Shared linear/angular tolerance. Parallelism tests compare the sine of the
/// angle between unit directions against it, coincidence tests compare lengths.
pub const EPSILON: f64 = 1e-6;

pub trait ApproxEq {
    fn approx_eq(&self, other: &Self) -> bool;
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).abs() < EPSILON
    }
}

impl ApproxEq for Point3 {
    fn approx_eq(&self, other: &Self) -> bool {
        na::distance_squared(self, other) < EPSILON * EPSILON
    }
}

impl ApproxEq for Vector3 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).norm_squared() < EPSILON * EPSILON
    }
}

impl ApproxEq for Point2 {
    fn approx_eq(&self, other: &Self) -> bool {
        na::distance_squared(self, other) < EPSILON * EPSILON
    }
}

/// Errors raised by the fallible geometry constructors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Degenerate direction: {0}")]
    DegenerateDirection(String),

    #[error("Degenerate plane basis: {0}")]
    DegeneratePlane(String),
}

/// True when two unit directions are parallel or anti-parallel.
pub fn is_parallel(a: &Vector3, b: &Vector3) -> bool {
    a.cross(b).norm() < EPSILON
}

pub mod primitives;
pub use primitives::*;

pub mod utils_3d;
pub use utils_3d::{Ray, ray_plane_intersect, plane_plane_intersect, rotate_about};

pub mod intersection;
pub use intersection::*;
