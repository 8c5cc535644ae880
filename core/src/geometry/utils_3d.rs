//! 3D geometry utilities for snapping.
//!
//! Pure functions for ray casting against planes, plane/plane intersection
//! and rotations about an arbitrary direction.

use nalgebra as na;
use super::{Plane, Point3, Vector3, EPSILON};

// =============================================================================
// Ray Representation
// =============================================================================

/// A ray defined by an origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Ray {
    /// Create a new ray from origin and direction.
    pub fn new(origin: Point3, direction: Vector3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at parameter t.
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

// =============================================================================
// Plane Intersections
// =============================================================================

/// Intersect a ray with a plane.
/// Returns Some(t, point) where t is the ray parameter, or None if parallel.
pub fn ray_plane_intersect(ray: &Ray, plane: &Plane) -> Option<(f64, Point3)> {
    let denom = plane.normal.dot(&ray.direction);

    if denom.abs() < EPSILON {
        return None; // Ray is parallel to plane
    }

    let t = plane.normal.dot(&(plane.origin - ray.origin)) / denom;

    if t < 0.0 {
        return None; // Intersection is behind ray origin
    }

    Some((t, ray.at(t)))
}

/// Intersect two planes to get a line.
/// Returns Some((point_on_line, direction)) or None if planes are parallel.
pub fn plane_plane_intersect(p1: &Plane, p2: &Plane) -> Option<(Point3, Vector3)> {
    let direction = p1.normal.cross(&p2.normal);

    if direction.norm() < EPSILON {
        return None; // Planes are parallel
    }

    let n1 = p1.normal;
    let n2 = p2.normal;
    let d1 = n1.dot(&p1.origin.coords);
    let d2 = n2.dot(&p2.origin.coords);

    // Point on both planes closest to the world origin:
    // p = (d1 (n2 x dir) + d2 (dir x n1)) / |dir|^2
    let point = (n2.cross(&direction) * d1 + direction.cross(&n1) * d2) / direction.norm_squared();

    Some((Point3::from(point), direction.normalize()))
}

// =============================================================================
// Rotations
// =============================================================================

/// Rotate `v` by `angle` radians about the unit direction `axis`.
pub fn rotate_about(v: &Vector3, axis: &Vector3, angle: f64) -> Vector3 {
    let rotation = na::Rotation3::from_axis_angle(&na::Unit::new_normalize(*axis), angle);
    rotation * v
}

// =============================================================================
// Tests
// =============================================================================
