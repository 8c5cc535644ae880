//! 3D intersection calculations for snapping: lines, circles and their
//! combinations. All results are unbounded; callers restrict them to curve
//! parameter ranges.

use super::{plane_plane_intersect, Circle3, Line3, Point3, Vector3, EPSILON};

/// Parameters `(s, t)` of the mutually closest points of the lines
/// `p0 + s*d0` and `p1 + t*d1`. Returns None if the lines are parallel.
pub fn line_line_closest_parameters(
    p0: &Point3, d0: &Vector3,
    p1: &Point3, d1: &Vector3,
) -> Option<(f64, f64)> {
    let a = d0.dot(d0);
    let b = d0.dot(d1);
    let c = d1.dot(d1);

    // Sine of the angle between the directions
    if d0.cross(d1).norm() < EPSILON * (a * c).sqrt() {
        return None;
    }

    let w = p0 - p1;
    let d = d0.dot(&w);
    let e = d1.dot(&w);
    let denom = a * c - b * b;

    let s = (b * e - c * d) / denom;
    let t = (a * e - b * d) / denom;
    Some((s, t))
}

/// Intersection point of two infinite 3D lines.
/// Returns None if the lines are parallel or skew (closest distance above tolerance).
pub fn line_line_intersection(l1: &Line3, l2: &Line3) -> Option<Point3> {
    let (s, t) = line_line_closest_parameters(&l1.origin, &l1.direction, &l2.origin, &l2.direction)?;
    let p = l1.origin + l1.direction * s;
    let q = l2.origin + l2.direction * t;
    if (p - q).norm() < EPSILON {
        Some(p)
    } else {
        None
    }
}

/// Intersections of an infinite line with a full circle.
pub fn line_circle_intersections(line: &Line3, circle: &Circle3) -> Vec<Point3> {
    let plane = circle.plane();
    let denom = circle.normal.dot(&line.direction);

    if denom.abs() >= EPSILON {
        // Line pierces the circle plane at exactly one point
        return match plane.intersect_line(line) {
            Some(p) if ((p - circle.center).norm() - circle.radius).abs() < EPSILON => vec![p],
            _ => Vec::new(),
        };
    }

    if !plane.contains_point(&line.origin) {
        return Vec::new(); // Parallel and off-plane
    }

    // In-plane: |origin + t*dir - center|^2 = r^2
    let w = line.origin - circle.center;
    let b = w.dot(&line.direction);
    let c = w.dot(&w) - circle.radius * circle.radius;
    let disc = b * b - c;

    if disc.abs() < EPSILON {
        vec![line.origin - line.direction * b]
    } else if disc < 0.0 {
        Vec::new()
    } else {
        let root = disc.sqrt();
        vec![
            line.origin + line.direction * (-b - root),
            line.origin + line.direction * (-b + root),
        ]
    }
}

/// Intersections of two full circles.
pub fn circle_circle_intersections(c1: &Circle3, c2: &Circle3) -> Vec<Point3> {
    if c1.normal.cross(&c2.normal).norm() >= EPSILON {
        // Different planes: the candidates lie on the planes' common line
        let Some((point, direction)) = plane_plane_intersect(&c1.plane(), &c2.plane()) else {
            return Vec::new();
        };
        let line = Line3::new(point, direction);
        return line_circle_intersections(&line, c1)
            .into_iter()
            .filter(|p| ((p - c2.center).norm() - c2.radius).abs() < EPSILON)
            .collect();
    }

    if !c1.plane().contains_point(&c2.center) {
        return Vec::new();
    }

    let delta = c2.center - c1.center;
    let d = delta.norm();
    if d < EPSILON {
        return Vec::new(); // Concentric
    }
    if d > c1.radius + c2.radius + EPSILON || d < (c1.radius - c2.radius).abs() - EPSILON {
        return Vec::new();
    }

    let u = delta / d;
    let a = (c1.radius * c1.radius - c2.radius * c2.radius + d * d) / (2.0 * d);
    let h = (c1.radius * c1.radius - a * a).max(0.0).sqrt();
    let base = c1.center + u * a;

    if h < EPSILON {
        vec![base]
    } else {
        let perp = c1.normal.cross(&u);
        vec![base + perp * h, base - perp * h]
    }
}
