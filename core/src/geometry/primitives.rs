use super::{ApproxEq, GeometryError, Point3, Vector3, EPSILON};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Line3 {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Line3 {
    pub fn new(origin: Point3, direction: Vector3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn project_point(&self, p: &Point3) -> Point3 {
        self.origin + self.direction * self.parameter_of(p)
    }

    /// Signed distance along the line from its origin to the projection of `p`.
    pub fn parameter_of(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(&self.direction)
    }

    pub fn distance_to_point(&self, p: &Point3) -> f64 {
        let proj = self.project_point(p);
        (p - proj).norm()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3,
    pub normal: Vector3,
}

impl Plane {
    pub fn new(origin: Point3, normal: Vector3) -> Self {
        Self {
            origin,
            normal: normal.normalize(),
        }
    }

    pub fn signed_distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&(p - self.origin))
    }

    pub fn project_point(&self, p: &Point3) -> Point3 {
        p - self.normal * self.signed_distance(p)
    }

    pub fn contains_point(&self, p: &Point3) -> bool {
        self.signed_distance(p).abs() < EPSILON
    }

    pub fn intersect_line(&self, line: &Line3) -> Option<Point3> {
        let denom = self.normal.dot(&line.direction);
        if denom.abs() < EPSILON {
            return None; // Parallel
        }
        let v = self.origin - line.origin;
        let t = v.dot(&self.normal) / denom;
        Some(line.origin + line.direction * t)
    }
}

/// The active reference plane for snapping and axis generation: an origin
/// plus a right-handed orthonormal basis (`x_dir`, `y_dir`, `normal`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Workplane {
    pub origin: Point3,
    pub normal: Vector3,
    pub x_dir: Vector3,
    pub y_dir: Vector3,
}

impl Default for Workplane {
    fn default() -> Self {
        Self::xy()
    }
}

impl Workplane {
    /// Builds a workplane from a normal and an in-plane x direction. The x
    /// direction is re-orthogonalized against the normal.
    pub fn try_new(origin: Point3, normal: Vector3, x_dir: Vector3) -> Result<Self, GeometryError> {
        let n = normal
            .try_normalize(EPSILON)
            .ok_or_else(|| GeometryError::DegeneratePlane(format!("zero normal {:?}", normal)))?;
        let x = (x_dir - n * x_dir.dot(&n))
            .try_normalize(EPSILON)
            .ok_or_else(|| GeometryError::DegeneratePlane(format!("x direction {:?} parallel to normal", x_dir)))?;
        Ok(Self {
            origin,
            normal: n,
            x_dir: x,
            y_dir: n.cross(&x),
        })
    }

    /// XY plane at z = 0
    pub fn xy() -> Self {
        Self {
            origin: Point3::origin(),
            normal: Vector3::z(),
            x_dir: Vector3::x(),
            y_dir: Vector3::y(),
        }
    }

    /// XZ plane at y = 0, normal pointing to -Y so that X × Z stays right-handed.
    pub fn xz() -> Self {
        Self {
            origin: Point3::origin(),
            normal: -Vector3::y(),
            x_dir: Vector3::x(),
            y_dir: Vector3::z(),
        }
    }

    /// YZ plane at x = 0
    pub fn yz() -> Self {
        Self {
            origin: Point3::origin(),
            normal: Vector3::x(),
            x_dir: Vector3::y(),
            y_dir: Vector3::z(),
        }
    }

    pub fn with_origin(&self, origin: Point3) -> Self {
        Self { origin, ..*self }
    }

    pub fn plane(&self) -> Plane {
        Plane::new(self.origin, self.normal)
    }

    /// Maps plane-local coordinates to world space.
    pub fn point_at(&self, x: f64, y: f64, z: f64) -> Point3 {
        self.origin + self.x_dir * x + self.y_dir * y + self.normal * z
    }

    pub fn is_same(&self, other: &Workplane) -> bool {
        self.origin.approx_eq(&other.origin)
            && self.normal.approx_eq(&other.normal)
            && self.x_dir.approx_eq(&other.x_dir)
    }
}

/// A full circle in 3D. Angles are measured from `x_axis` towards
/// `normal × x_axis`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Circle3 {
    pub center: Point3,
    pub normal: Vector3,
    pub x_axis: Vector3,
    pub radius: f64,
}

impl Circle3 {
    pub fn new(center: Point3, normal: Vector3, x_axis: Vector3, radius: f64) -> Self {
        let n = normal.normalize();
        let x = (x_axis - n * x_axis.dot(&n)).normalize();
        Self {
            center,
            normal: n,
            x_axis: x,
            radius,
        }
    }

    pub fn y_axis(&self) -> Vector3 {
        self.normal.cross(&self.x_axis)
    }

    pub fn plane(&self) -> Plane {
        Plane::new(self.center, self.normal)
    }

    pub fn point_at_angle(&self, angle: f64) -> Point3 {
        self.center + (self.x_axis * angle.cos() + self.y_axis() * angle.sin()) * self.radius
    }

    /// Angle in `(-π, π]` of the projection of `p` onto the circle plane.
    pub fn angle_of(&self, p: &Point3) -> f64 {
        let v = p - self.center;
        v.dot(&self.y_axis()).atan2(v.dot(&self.x_axis))
    }

    pub fn contains_point(&self, p: &Point3) -> bool {
        self.plane().contains_point(p) && ((p - self.center).norm() - self.radius).abs() < EPSILON
    }
}
