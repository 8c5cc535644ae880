//! Analytic reference curves: straight segments and circular arcs.

use super::{AnalyticCurve, Curve};
use crate::geometry::{Circle3, Line3, Point3, Vector3, EPSILON};
use std::f64::consts::{PI, TAU};

/// A straight segment parameterized by arc length from `start`.
#[derive(Debug, Clone, Copy)]
pub struct LineCurve {
    pub start: Point3,
    pub end: Point3,
}

impl LineCurve {
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    fn direction(&self) -> Vector3 {
        (self.end - self.start).try_normalize(EPSILON).unwrap_or_else(Vector3::x)
    }
}

impl Curve for LineCurve {
    fn first_parameter(&self) -> f64 {
        0.0
    }

    fn last_parameter(&self) -> f64 {
        (self.end - self.start).norm()
    }

    fn value_at(&self, parameter: f64) -> Point3 {
        self.start + self.direction() * parameter
    }

    fn nearest_parameter(&self, point: &Point3) -> f64 {
        (point - self.start).dot(&self.direction())
    }

    fn analytic(&self) -> AnalyticCurve {
        AnalyticCurve::Line(Line3::new(self.start, self.direction()))
    }

    fn discretize(&self) -> Vec<Point3> {
        vec![self.start, self.end]
    }
}

/// A circular arc parameterized by angle in radians, `start_angle < end_angle`.
#[derive(Debug, Clone, Copy)]
pub struct ArcCurve {
    pub circle: Circle3,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl ArcCurve {
    pub fn new(center: Point3, normal: Vector3, x_axis: Vector3, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        let (start_angle, end_angle) = if end_angle < start_angle {
            (start_angle, end_angle + TAU)
        } else {
            (start_angle, end_angle)
        };
        Self {
            circle: Circle3::new(center, normal, x_axis, radius),
            start_angle,
            end_angle,
        }
    }

    /// A full circle starting on the x axis of an arbitrary in-plane basis.
    pub fn circle(center: Point3, normal: Vector3, radius: f64) -> Self {
        let helper = if normal.normalize().x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
        Self::new(center, normal, helper, radius, 0.0, TAU)
    }

    pub fn is_closed(&self) -> bool {
        (self.end_angle - self.start_angle - TAU).abs() < EPSILON
    }
}

impl Curve for ArcCurve {
    fn first_parameter(&self) -> f64 {
        self.start_angle
    }

    fn last_parameter(&self) -> f64 {
        self.end_angle
    }

    fn value_at(&self, parameter: f64) -> Point3 {
        self.circle.point_at_angle(parameter)
    }

    /// Unwraps the polar angle to the turn closest to the middle of the arc,
    /// so points on the arc map inside `[start_angle, end_angle]`.
    fn nearest_parameter(&self, point: &Point3) -> f64 {
        let mid = (self.start_angle + self.end_angle) / 2.0;
        let angle = self.circle.angle_of(point);
        angle + TAU * ((mid - angle + PI) / TAU).floor()
    }

    fn analytic(&self) -> AnalyticCurve {
        AnalyticCurve::Circle(self.circle)
    }

    fn contains_parameter(&self, parameter: f64) -> bool {
        self.is_closed()
            || (parameter >= self.start_angle - EPSILON && parameter <= self.end_angle + EPSILON)
    }
}
