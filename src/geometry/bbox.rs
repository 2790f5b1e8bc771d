//! Axis-aligned bounding boxes in XYXY format.

use serde::{Deserialize, Serialize};

use super::{to_points, Point};
use crate::format::ShapeType;

/// An axis-aligned bounding box (xmin, ymin, xmax, ymax) in pixels.
///
/// The constructor does not enforce `min <= max`; callers check
/// [`is_ordered`](Self::is_ordered) where it matters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BBoxXYXY {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BBoxXYXY {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Converts from XYWH format where (x, y) is the top-left corner.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    /// Tightest box around a set of points. Empty input yields the zero box.
    pub fn from_points(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        points.iter().skip(1).fold(
            Self::from_xyxy(first.x, first.y, first.x, first.y),
            |acc, p| {
                Self::from_xyxy(
                    acc.xmin.min(p.x),
                    acc.ymin.min(p.y),
                    acc.xmax.max(p.x),
                    acc.ymax.max(p.y),
                )
            },
        )
    }

    /// Tightest box around flat points, widened by `margin` on every side.
    pub fn wrapping(flat: &[f64], margin: f64) -> Self {
        let b = Self::from_points(&to_points(flat));
        Self::from_xyxy(
            b.xmin - margin,
            b.ymin - margin,
            b.xmax + margin,
            b.ymax + margin,
        )
    }

    /// Box covered by a shape of the given type.
    ///
    /// Ellipses are stored as `[cx, cy, rx_point_x, ry_point_y]`; masks
    /// carry their inclusive pixel box in the last four values.
    pub fn of_shape(shape_type: ShapeType, flat: &[f64]) -> Self {
        match shape_type {
            ShapeType::Ellipse if flat.len() >= 4 => {
                let rx = (flat[2] - flat[0]).abs();
                let ry = (flat[1] - flat[3]).abs();
                Self::from_xyxy(flat[0] - rx, flat[1] - ry, flat[0] + rx, flat[1] + ry)
            }
            ShapeType::Mask if flat.len() >= 4 => {
                let n = flat.len();
                Self::from_xyxy(flat[n - 4], flat[n - 3], flat[n - 2] + 1.0, flat[n - 1] + 1.0)
            }
            _ => Self::from_points(&to_points(flat)),
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Area of the box; negative when the box is malformed.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite() && self.ymin.is_finite() && self.xmax.is_finite() && self.ymax.is_finite()
    }

    /// Returns true if min <= max on both axes.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    /// Returns true if the two boxes share any area.
    pub fn intersects(&self, other: &BBoxXYXY) -> bool {
        self.xmin < other.xmax && other.xmin < self.xmax && self.ymin < other.ymax && other.ymin < self.ymax
    }

    pub fn center(&self) -> Point {
        Point::new((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dimensions() {
        let bbox = BBoxXYXY::from_xyxy(10.0, 20.0, 100.0, 80.0);
        assert_eq!(bbox.width(), 90.0);
        assert_eq!(bbox.height(), 60.0);
        assert_eq!(bbox.area(), 5400.0);
    }

    #[test]
    fn test_bbox_ordering() {
        assert!(BBoxXYXY::from_xyxy(10.0, 20.0, 100.0, 80.0).is_ordered());
        assert!(!BBoxXYXY::from_xyxy(100.0, 80.0, 10.0, 20.0).is_ordered());
    }

    #[test]
    fn test_wrapping_box_with_margin() {
        let bbox = BBoxXYXY::wrapping(&[5.0, 5.0, 1.0, 9.0, 3.0, 2.0], 1.0);
        assert_eq!(bbox, BBoxXYXY::from_xyxy(0.0, 1.0, 6.0, 10.0));
    }

    #[test]
    fn test_ellipse_box() {
        let bbox = BBoxXYXY::of_shape(ShapeType::Ellipse, &[50.0, 50.0, 60.0, 45.0]);
        assert_eq!(bbox, BBoxXYXY::from_xyxy(40.0, 45.0, 60.0, 55.0));
    }

    #[test]
    fn test_mask_box_is_inclusive() {
        let bbox = BBoxXYXY::of_shape(ShapeType::Mask, &[0.0, 4.0, 2.0, 3.0, 3.0, 4.0]);
        assert_eq!(bbox.width(), 2.0);
        assert_eq!(bbox.height(), 2.0);
    }
}
