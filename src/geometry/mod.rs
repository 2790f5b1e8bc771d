//! Pure geometry helpers shared by annotations, interpolation and masks.
//!
//! Coordinates are stored flat (`[x0, y0, x1, y1, ...]`) throughout the
//! crate; this module converts between the flat layout and [`Point`]s and
//! provides rotation, angles, bounding boxes, hulls and distance tests.

mod angle;
mod bbox;
mod distance;
mod hull;

pub use angle::{find_angle_diff, interpolate_angle, normalize_angle};
pub use bbox::BBoxXYXY;
pub use distance::HitTestable;
pub use hull::convex_hull;

use serde::{Deserialize, Serialize};

/// A 2D point in frame pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Splits a flat coordinate list into points. A trailing odd value is ignored.
pub fn to_points(flat: &[f64]) -> Vec<Point> {
    flat.chunks_exact(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect()
}

/// Flattens points back into `[x0, y0, x1, y1, ...]`.
pub fn to_flat(points: &[Point]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

/// Rotates `point` around `center` by `degrees` (clockwise in image space).
pub fn rotate_point(point: Point, center: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Distance from `p` to the segment `a`-`b`.
pub fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(&a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(&Point::new(a.x + t * dx, a.y + t * dy))
}
