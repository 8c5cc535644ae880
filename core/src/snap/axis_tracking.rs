use super::Axis;
use crate::geometry::{rotate_about, Point3, Workplane};
use crate::view::ViewId;
use std::collections::HashMap;

/// Static alignment axes anchored at the operation's reference point.
///
/// Axes are memoized per view; [`clear`](Self::clear) drops them when the
/// snap configuration changes.
#[derive(Debug)]
pub struct AxisTracking {
    track_z: bool,
    axes: HashMap<ViewId, Vec<Axis>>,
}

impl AxisTracking {
    pub fn new(track_z: bool) -> Self {
        Self {
            track_z,
            axes: HashMap::new(),
        }
    }

    pub fn track_z(&self) -> bool {
        self.track_z
    }

    /// Axes through `reference` for the view's workplane. With an angle step
    /// (degrees) the in-plane axes are the polar fan `0, step, 2*step, ...`
    /// below 360.
    pub fn get_axes(&mut self, view: ViewId, workplane: &Workplane, reference: Point3, angle_step: Option<f64>) -> &[Axis] {
        let track_z = self.track_z;
        self.axes.entry(view).or_insert_with(|| match angle_step {
            None => Axis::axes_at_plane(reference, workplane, track_z),
            Some(step) => polar_axes(reference, workplane, step, track_z),
        })
    }

    pub fn clear(&mut self) {
        self.axes.clear();
    }
}

fn polar_axes(reference: Point3, workplane: &Workplane, step: f64, track_z: bool) -> Vec<Axis> {
    let mut axes = Vec::new();
    if step > 0.0 {
        let mut index = 0u32;
        loop {
            let angle = step * index as f64;
            if angle >= 360.0 {
                break;
            }
            let direction = rotate_about(&workplane.x_dir, &workplane.normal, angle.to_radians());
            axes.push(Axis::new(reference, direction, format!("{}°", angle)));
            index += 1;
        }
    }
    if track_z {
        axes.push(Axis::new(reference, workplane.normal, super::labels::AXIS_Z));
        axes.push(Axis::new(reference, -workplane.normal, super::labels::AXIS_Z));
    }
    axes
}
