use super::{labels, SnapResult};
use crate::config::{ObjectSnapTypes, SnapType};
use crate::kernel::{Shape, ShapeId, ShapeRef};
use crate::view::ViewId;
use std::collections::HashMap;
use tracing::trace;

/// Canonical snap candidates of single shapes: vertex points, edge endpoints
/// and parametric edge midpoints.
///
/// Results are cached per shape id. The cache is dropped whenever the snap
/// type mask changes or [`clear`](Self::clear) is called, so results computed
/// under another mask are never served.
#[derive(Debug)]
pub struct FeaturePointStrategy {
    snap_types: ObjectSnapTypes,
    cache: HashMap<ShapeId, Vec<SnapResult>>,
}

impl FeaturePointStrategy {
    pub fn new(snap_types: ObjectSnapTypes) -> Self {
        Self {
            snap_types,
            cache: HashMap::new(),
        }
    }

    pub fn snap_types(&self) -> ObjectSnapTypes {
        self.snap_types
    }

    pub fn update_snap_type(&mut self, snap_types: ObjectSnapTypes) {
        self.snap_types = snap_types;
        self.clear();
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn get_feature_points(&mut self, view: ViewId, shape: &ShapeRef) -> Vec<SnapResult> {
        if let Some(points) = self.cache.get(&shape.id) {
            return points
                .iter()
                .cloned()
                .map(|mut point| {
                    point.view = view;
                    point
                })
                .collect();
        }
        let points = self.compute(view, shape);
        trace!("Computed {} feature points for shape {}", points.len(), shape.id);
        self.cache.insert(shape.id, points.clone());
        points
    }

    fn compute(&self, view: ViewId, shape: &ShapeRef) -> Vec<SnapResult> {
        let mut points = Vec::new();
        let result = |point, info: &str| SnapResult::new(view, point).with_info(info).with_shapes(vec![shape.clone()]);

        match shape.shape.as_ref() {
            Shape::Vertex(point) => {
                if self.snap_types.contains(SnapType::Vertex) {
                    points.push(result(shape.transform * point, labels::VERTEX));
                }
            }
            Shape::Edge(edge) => {
                let first = edge.curve.first_parameter();
                let last = edge.curve.last_parameter();
                if self.snap_types.contains(SnapType::Endpoint) {
                    points.push(result(shape.transform * edge.curve.value_at(first), labels::END));
                    points.push(result(shape.transform * edge.curve.value_at(last), labels::END));
                }
                if self.snap_types.contains(SnapType::Midpoint) {
                    let mid = edge.curve.value_at((first + last) / 2.0);
                    points.push(result(shape.transform * mid, labels::MID));
                }
            }
            // Faces contribute through their edges
            Shape::Face(_) => {}
        }
        points
    }
}
