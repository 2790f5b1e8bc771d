//! Click hit-testing per geometry type.

use super::{convex_hull, rotate_point, segment_distance, to_points, BBoxXYXY, Point};
use crate::format::ShapeType;
use crate::mask;

/// Proximity of a point to a geometry, used to pick the clicked object.
pub trait HitTestable {
    /// Returns how deep (or how close) `(x, y)` lies relative to the
    /// geometry described by `points`, or `None` when it misses.
    ///
    /// For area geometries the value is the distance to the nearest edge
    /// from inside; for open geometries it is the distance to the nearest
    /// vertex or segment.
    fn distance(&self, points: &[f64], x: f64, y: f64, rotation: f64) -> Option<f64>;
}

impl HitTestable for ShapeType {
    fn distance(&self, points: &[f64], x: f64, y: f64, rotation: f64) -> Option<f64> {
        let p = Point::new(x, y);
        match self {
            ShapeType::Rectangle => rectangle_distance(points, p, rotation),
            ShapeType::Polygon => polygon_distance(&to_points(points), p),
            ShapeType::Polyline => polyline_distance(&to_points(points), p),
            ShapeType::Points => to_points(points)
                .iter()
                .map(|q| q.distance(&p))
                .min_by(f64::total_cmp),
            ShapeType::Ellipse => ellipse_distance(points, p, rotation),
            ShapeType::Cuboid => polygon_distance(&convex_hull(&to_points(points)), p),
            ShapeType::Mask => mask_distance(points, p),
            ShapeType::Skeleton => None,
        }
    }
}

fn rectangle_distance(points: &[f64], p: Point, rotation: f64) -> Option<f64> {
    if points.len() < 4 {
        return None;
    }
    let bbox = BBoxXYXY::from_xyxy(points[0], points[1], points[2], points[3]);
    let local = if rotation != 0.0 {
        rotate_point(p, bbox.center(), -rotation)
    } else {
        p
    };
    if !bbox.contains(local) {
        return None;
    }
    Some(
        (local.x - bbox.xmin)
            .min(local.y - bbox.ymin)
            .min(bbox.xmax - local.x)
            .min(bbox.ymax - local.y),
    )
}

fn point_in_polygon(polygon: &[Point], p: Point) -> bool {
    let mut inside = false;
    let n = polygon.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn polygon_distance(polygon: &[Point], p: Point) -> Option<f64> {
    if polygon.len() < 3 || !point_in_polygon(polygon, p) {
        return None;
    }
    (0..polygon.len())
        .map(|i| segment_distance(p, polygon[i], polygon[(i + 1) % polygon.len()]))
        .min_by(f64::total_cmp)
}

fn polyline_distance(polyline: &[Point], p: Point) -> Option<f64> {
    polyline
        .windows(2)
        .map(|w| segment_distance(p, w[0], w[1]))
        .min_by(f64::total_cmp)
}

fn ellipse_distance(points: &[f64], p: Point, rotation: f64) -> Option<f64> {
    if points.len() < 4 {
        return None;
    }
    let center = Point::new(points[0], points[1]);
    let rx = (points[2] - points[0]).abs();
    let ry = (points[1] - points[3]).abs();
    if rx == 0.0 || ry == 0.0 {
        return None;
    }

    let local = rotate_point(p, center, -rotation);
    let dx = local.x - center.x;
    let dy = local.y - center.y;
    let value = (dx * dx) / (rx * rx) + (dy * dy) / (ry * ry);
    if value > 1.0 {
        return None;
    }
    if value == 0.0 {
        return Some(rx.min(ry));
    }
    // distance to the boundary along the ray from the center
    Some(local.distance(&center) * (1.0 / value.sqrt() - 1.0))
}

fn mask_distance(points: &[f64], p: Point) -> Option<f64> {
    let n = points.len();
    if n < 4 {
        return None;
    }
    let (left, top, right, bottom) = (points[n - 4], points[n - 3], points[n - 2], points[n - 1]);
    let (px, py) = (p.x.floor(), p.y.floor());
    if px < left || px > right || py < top || py > bottom {
        return None;
    }

    let width = (right - left + 1.0) as usize;
    let index = (py - top) as usize * width + (px - left) as usize;
    if !mask::is_foreground_at(&points[..n - 4], index) {
        return None;
    }
    Some(
        (p.x - left)
            .min(p.y - top)
            .min(right + 1.0 - p.x)
            .min(bottom + 1.0 - p.y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_inside_and_outside() {
        let rect = [0.0, 0.0, 10.0, 10.0];
        assert_eq!(ShapeType::Rectangle.distance(&rect, 2.0, 5.0, 0.0), Some(2.0));
        assert_eq!(ShapeType::Rectangle.distance(&rect, 12.0, 5.0, 0.0), None);
    }

    #[test]
    fn test_rotated_rectangle_uses_local_frame() {
        // a thin horizontal bar rotated 90 degrees becomes vertical
        let rect = [0.0, 4.0, 10.0, 6.0];
        assert_eq!(ShapeType::Rectangle.distance(&rect, 9.0, 5.0, 0.0), Some(1.0));
        assert_eq!(ShapeType::Rectangle.distance(&rect, 9.0, 5.0, 90.0), None);
        assert!(ShapeType::Rectangle.distance(&rect, 5.0, 9.0, 90.0).is_some());
    }

    #[test]
    fn test_polygon_distance() {
        let triangle = [0.0, 0.0, 10.0, 0.0, 0.0, 10.0];
        assert_eq!(ShapeType::Polygon.distance(&triangle, 1.0, 2.0, 0.0), Some(1.0));
        assert_eq!(ShapeType::Polygon.distance(&triangle, 9.0, 9.0, 0.0), None);
    }

    #[test]
    fn test_open_geometries_always_report_distance() {
        let line = [0.0, 0.0, 10.0, 0.0];
        assert_eq!(ShapeType::Polyline.distance(&line, 5.0, 4.0, 0.0), Some(4.0));
        let pts = [0.0, 0.0, 10.0, 10.0];
        assert_eq!(ShapeType::Points.distance(&pts, 10.0, 13.0, 0.0), Some(3.0));
    }

    #[test]
    fn test_ellipse_center_and_outside() {
        let ellipse = [50.0, 50.0, 60.0, 45.0];
        assert_eq!(ShapeType::Ellipse.distance(&ellipse, 50.0, 50.0, 0.0), Some(5.0));
        let half = ShapeType::Ellipse.distance(&ellipse, 55.0, 50.0, 0.0).unwrap();
        assert!((half - 5.0).abs() < 1e-9);
        assert_eq!(ShapeType::Ellipse.distance(&ellipse, 61.0, 50.0, 0.0), None);
    }

    #[test]
    fn test_mask_hits_only_foreground() {
        // 2x2 box at (10, 10): pixels bg, fg, fg, bg
        let mask = [1.0, 2.0, 1.0, 10.0, 10.0, 11.0, 11.0];
        assert!(ShapeType::Mask.distance(&mask, 11.5, 10.5, 0.0).is_some());
        assert_eq!(ShapeType::Mask.distance(&mask, 10.5, 10.5, 0.0), None);
        assert_eq!(ShapeType::Mask.distance(&mask, 30.0, 30.0, 0.0), None);
    }

    #[test]
    fn test_skeleton_never_hits_directly() {
        assert_eq!(ShapeType::Skeleton.distance(&[], 0.0, 0.0, 0.0), None);
    }
}
