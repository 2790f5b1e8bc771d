use super::Point;

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull of a point set (Andrew's monotone chain), counter-clockwise.
///
/// Collinear points on the hull boundary are dropped. Inputs with fewer than
/// three distinct points are returned deduplicated and sorted.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_with_interior_point() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point::new(2.0, 2.0)));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(convex_hull(&[]).is_empty());
        let two = convex_hull(&[Point::new(1.0, 1.0), Point::new(1.0, 1.0), Point::new(0.0, 0.0)]);
        assert_eq!(two, vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
    }
}
