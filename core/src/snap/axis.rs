use super::labels;
use crate::geometry::{
    is_parallel, line_line_closest_parameters, GeometryError, Line3, Point3, Ray, Vector3, Workplane, EPSILON,
};

/// A labeled ray: the atomic tracking primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub location: Point3,
    /// Unit length
    pub direction: Vector3,
    pub name: String,
}

impl Axis {
    /// `direction` is normalized; it must not be zero.
    pub fn new(location: Point3, direction: Vector3, name: impl Into<String>) -> Self {
        Self {
            location,
            direction: direction.normalize(),
            name: name.into(),
        }
    }

    pub fn try_new(location: Point3, direction: Vector3, name: impl Into<String>) -> Result<Self, GeometryError> {
        let direction = direction
            .try_normalize(EPSILON)
            .ok_or_else(|| GeometryError::DegenerateDirection(format!("{:?}", direction)))?;
        Ok(Self {
            location,
            direction,
            name: name.into(),
        })
    }

    /// The workplane fan anchored at `location`: +X, -X, +Y, -Y and, with
    /// `include_normal`, +Z and -Z. Order is stable; tie-breaks rely on it.
    pub fn axes_at_plane(location: Point3, plane: &Workplane, include_normal: bool) -> Vec<Axis> {
        let mut axes = vec![
            Axis::new(location, plane.x_dir, labels::AXIS_X),
            Axis::new(location, -plane.x_dir, labels::AXIS_X),
            Axis::new(location, plane.y_dir, labels::AXIS_Y),
            Axis::new(location, -plane.y_dir, labels::AXIS_Y),
        ];
        if include_normal {
            axes.push(Axis::new(location, plane.normal, labels::AXIS_Z));
            axes.push(Axis::new(location, -plane.normal, labels::AXIS_Z));
        }
        axes
    }

    pub fn line(&self) -> Line3 {
        Line3 {
            origin: self.location,
            direction: self.direction,
        }
    }

    /// Signed distance from the axis origin to the projection of `point`.
    pub fn parameter_of(&self, point: &Point3) -> f64 {
        (point - self.location).dot(&self.direction)
    }

    /// Point on this axis closest to the ray's line. Parallel rays fall back
    /// to projecting the ray origin onto the axis.
    pub fn nearest_point_to(&self, ray: &Ray) -> Point3 {
        match line_line_closest_parameters(&self.location, &self.direction, &ray.origin, &ray.direction) {
            Some((s, _)) => self.location + self.direction * s,
            None => self.location + self.direction * self.parameter_of(&ray.origin),
        }
    }

    /// Intersection with another axis, if the two are coplanar and not parallel.
    pub fn intersect(&self, other: &Axis) -> Option<Point3> {
        if is_parallel(&self.direction, &other.direction) {
            return None;
        }
        let (s, t) = line_line_closest_parameters(&self.location, &self.direction, &other.location, &other.direction)?;
        let p = self.location + self.direction * s;
        let q = other.location + other.direction * t;
        if (p - q).norm() < EPSILON {
            Some(p)
        } else {
            None
        }
    }
}
