//! Shape and curve interface consumed by the snap engine.
//!
//! The geometry kernel itself lives outside this crate; snapping only needs to
//! discriminate shape kinds, evaluate curve parameters and intersect edges with
//! lines and with each other. `curves` provides analytic reference curves that
//! implement the [`Curve`] trait.

pub mod curves;

pub use curves::{ArcCurve, LineCurve};

use crate::geometry::{
    circle_circle_intersections, line_circle_intersections, line_line_intersection, ApproxEq,
    Circle3, Line3, Plane, Point3, Transform3, EPSILON,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stable identity of a shape instance in a document. Used as the cache key
/// for per-shape snap data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(pub Uuid);

impl ShapeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a deterministic ID based on a string seed (e.g. "Box1_Edge3").
    pub fn new_deterministic(seed: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()))
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed-form description of a curve's carrier geometry, in the curve's
/// local frame.
#[derive(Debug, Clone, Copy)]
pub enum AnalyticCurve {
    Line(Line3),
    Circle(Circle3),
    /// Freeform curve without a closed-form carrier
    Other,
}

impl AnalyticCurve {
    pub fn transformed(&self, transform: &Transform3) -> AnalyticCurve {
        match self {
            AnalyticCurve::Line(line) => AnalyticCurve::Line(Line3::new(
                transform * line.origin,
                transform * line.direction,
            )),
            AnalyticCurve::Circle(circle) => AnalyticCurve::Circle(Circle3::new(
                transform * circle.center,
                transform * circle.normal,
                transform * circle.x_axis,
                circle.radius,
            )),
            AnalyticCurve::Other => AnalyticCurve::Other,
        }
    }
}

/// A parametric curve as exposed by the geometry kernel.
pub trait Curve: fmt::Debug + Send + Sync {
    fn first_parameter(&self) -> f64;

    fn last_parameter(&self) -> f64;

    fn value_at(&self, parameter: f64) -> Point3;

    /// Parameter of the point on the curve's unbounded carrier closest to `point`.
    fn nearest_parameter(&self, point: &Point3) -> f64;

    fn analytic(&self) -> AnalyticCurve;

    fn contains_parameter(&self, parameter: f64) -> bool {
        parameter >= self.first_parameter() - EPSILON && parameter <= self.last_parameter() + EPSILON
    }

    /// Polyline approximation used for screen-space hit testing.
    fn discretize(&self) -> Vec<Point3> {
        const SEGMENTS: usize = 32;
        let (first, last) = (self.first_parameter(), self.last_parameter());
        (0..=SEGMENTS)
            .map(|i| self.value_at(first + (last - first) * i as f64 / SEGMENTS as f64))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub curve: Arc<dyn Curve>,
}

impl Edge {
    pub fn new(curve: impl Curve + 'static) -> Self {
        Self { curve: Arc::new(curve) }
    }
}

#[derive(Debug, Clone)]
pub struct Face {
    pub surface: Plane,
    pub boundary: Vec<Edge>,
}

/// Topological shape kinds the snap engine understands.
#[derive(Debug, Clone)]
pub enum Shape {
    Vertex(Point3),
    Edge(Edge),
    Face(Face),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Vertex,
    Edge,
    Face,
}

impl Shape {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Vertex(_) => ShapeType::Vertex,
            Shape::Edge(_) => ShapeType::Edge,
            Shape::Face(_) => ShapeType::Face,
        }
    }
}

/// A shape placed in the world: the detected entity handed to snappers.
#[derive(Debug, Clone)]
pub struct ShapeRef {
    pub id: ShapeId,
    pub shape: Arc<Shape>,
    pub transform: Transform3,
}

impl ShapeRef {
    pub fn new(id: ShapeId, shape: Shape) -> Self {
        Self {
            id,
            shape: Arc::new(shape),
            transform: Transform3::identity(),
        }
    }

    pub fn with_transform(mut self, transform: Transform3) -> Self {
        self.transform = transform;
        self
    }

    pub fn shape_type(&self) -> ShapeType {
        self.shape.shape_type()
    }

    pub fn edge(&self) -> Option<&Edge> {
        match self.shape.as_ref() {
            Shape::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    /// World-space point at `parameter` on the edge curve.
    pub fn edge_point_at(&self, parameter: f64) -> Option<Point3> {
        self.edge().map(|edge| self.transform * edge.curve.value_at(parameter))
    }

    /// World-space analytic carrier of the edge curve.
    pub fn world_curve(&self) -> Option<AnalyticCurve> {
        self.edge().map(|edge| edge.curve.analytic().transformed(&self.transform))
    }

    /// Whether a world-space point already known to lie on the carrier falls
    /// inside the edge's parameter range.
    pub fn edge_contains(&self, point: &Point3) -> bool {
        let Some(edge) = self.edge() else {
            return false;
        };
        let local = self.transform.inverse_transform_point(point);
        edge.curve.contains_parameter(edge.curve.nearest_parameter(&local))
    }

    /// Center of a circular edge.
    pub fn center(&self) -> Option<Point3> {
        match self.world_curve()? {
            AnalyticCurve::Circle(circle) => Some(circle.center),
            _ => None,
        }
    }

    /// Foot of the perpendicular dropped from `from` onto the edge, if it lies
    /// within the edge.
    pub fn perpendicular_foot(&self, from: &Point3) -> Option<Point3> {
        let edge = self.edge()?;
        let local = self.transform.inverse_transform_point(from);
        let parameter = edge.curve.nearest_parameter(&local);
        if !edge.curve.contains_parameter(parameter) {
            return None;
        }
        let foot = self.transform * edge.curve.value_at(parameter);
        if foot.approx_eq(from) {
            return None;
        }
        Some(foot)
    }

    /// Intersections of the edge with an infinite line, in world space.
    pub fn intersect_line(&self, line: &Line3) -> Vec<Point3> {
        let hits = match self.world_curve() {
            Some(AnalyticCurve::Line(carrier)) => line_line_intersection(&carrier, line).into_iter().collect(),
            Some(AnalyticCurve::Circle(circle)) => line_circle_intersections(line, &circle),
            Some(AnalyticCurve::Other) | None => Vec::new(),
        };
        hits.into_iter().filter(|p| self.edge_contains(p)).collect()
    }

    /// Intersections between two edges, in world space.
    pub fn intersect(&self, other: &ShapeRef) -> Vec<Point3> {
        let (Some(a), Some(b)) = (self.world_curve(), other.world_curve()) else {
            return Vec::new();
        };
        let hits = match (a, b) {
            (AnalyticCurve::Line(l1), AnalyticCurve::Line(l2)) => line_line_intersection(&l1, &l2).into_iter().collect(),
            (AnalyticCurve::Line(l), AnalyticCurve::Circle(c))
            | (AnalyticCurve::Circle(c), AnalyticCurve::Line(l)) => line_circle_intersections(&l, &c),
            (AnalyticCurve::Circle(c1), AnalyticCurve::Circle(c2)) => circle_circle_intersections(&c1, &c2),
            _ => Vec::new(),
        };
        hits.into_iter()
            .filter(|p| self.edge_contains(p) && other.edge_contains(p))
            .collect()
    }

    /// World-space polyline used for hit testing.
    pub fn discretize(&self) -> Vec<Point3> {
        match self.shape.as_ref() {
            Shape::Vertex(point) => vec![self.transform * point],
            Shape::Edge(edge) => edge.curve.discretize().into_iter().map(|p| self.transform * p).collect(),
            Shape::Face(face) => face
                .boundary
                .iter()
                .flat_map(|edge| edge.curve.discretize())
                .map(|p| self.transform * p)
                .collect(),
        }
    }
}
