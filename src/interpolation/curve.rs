//! Curve matching for polylines and polygons.
//!
//! Both curves are parameterized by normalized arc length. Every left vertex
//! is paired with the right vertex at the closest parameter, right vertices
//! nobody picked are attached to their closest left vertex, and each pair is
//! interpolated linearly. Runs of pairs that share one endpoint then
//! collapse points closer than `segment_length / (2 * run_length)`.

use crate::geometry::{to_flat, to_points, Point};

fn curve_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

fn offset_vector(points: &[Point]) -> Vec<f64> {
    let length = curve_length(points);
    let mut offsets = Vec::with_capacity(points.len());
    let mut accumulated = 0.0;
    offsets.push(0.0);
    for w in points.windows(2) {
        accumulated += w[0].distance(&w[1]);
        offsets.push(if length > 0.0 { accumulated / length } else { 0.0 });
    }
    offsets
}

fn nearest(value: f64, curve: &[f64]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, v) in curve.iter().enumerate() {
        let distance = (value - v).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// For each left vertex, the sorted right vertices it is paired with.
fn match_curves(left: &[f64], right: &[f64]) -> Vec<Vec<usize>> {
    let mut matching: Vec<Vec<usize>> = left.iter().map(|v| vec![nearest(*v, right)]).collect();

    let mut matched = vec![false; right.len()];
    for pairs in &matching {
        for &j in pairs {
            matched[j] = true;
        }
    }
    for (j, value) in right.iter().enumerate() {
        if !matched[j] {
            matching[nearest(*value, left)].push(j);
        }
    }
    for pairs in &mut matching {
        pairs.sort_unstable();
    }
    matching
}

fn average(points: &[Point]) -> Point {
    let n = points.len() as f64;
    let (x, y) = points.iter().fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
    Point::new(x / n, y / n)
}

fn minimize_segment(run: &[Point], base_length: f64) -> Vec<Point> {
    if run.len() < 2 {
        return run.to_vec();
    }
    let threshold = base_length / (2.0 * run.len() as f64);
    let last = run.len() - 1;

    let mut minimized = vec![run[0]];
    let mut latest = 0;
    for i in 1..last {
        if run[latest].distance(&run[i]) >= threshold {
            minimized.push(run[i]);
            latest = i;
        }
    }
    minimized.push(run[last]);

    if minimized.len() == 2 && run[0].distance(&run[last]) < threshold {
        return vec![average(&minimized)];
    }
    minimized
}

struct Pair {
    left: usize,
    right: usize,
    point: Point,
}

/// Which endpoint a run of consecutive pairs shares.
#[derive(PartialEq)]
enum Shared {
    Left,
    Right,
}

fn reduce(pairs: &[Pair], left: &[Point], right: &[Point]) -> Vec<Point> {
    let mut reduced = Vec::with_capacity(pairs.len());
    let mut start = 0;
    while start < pairs.len() {
        let shared = match pairs.get(start + 1) {
            Some(next) if next.left == pairs[start].left => Some(Shared::Left),
            Some(next) if next.right == pairs[start].right => Some(Shared::Right),
            _ => None,
        };
        let Some(shared) = shared else {
            reduced.push(pairs[start].point);
            start += 1;
            continue;
        };

        let mut end = start + 1;
        while end + 1 < pairs.len() {
            let same = match shared {
                Shared::Left => pairs[end + 1].left == pairs[start].left,
                Shared::Right => pairs[end + 1].right == pairs[start].right,
            };
            if !same {
                break;
            }
            end += 1;
        }

        // the run spreads along the curve on the side that varies
        let base_length = match shared {
            Shared::Left => curve_length(&right[pairs[start].right..=pairs[end].right]),
            Shared::Right => curve_length(&left[pairs[start].left..=pairs[end].left]),
        };
        let run: Vec<Point> = pairs[start..=end].iter().map(|p| p.point).collect();
        reduced.extend(minimize_segment(&run, base_length));
        start = end + 1;
    }
    reduced
}

fn interpolate_curves(left: &[Point], right: &[Point], offset: f64) -> Vec<Point> {
    let matching = match_curves(&offset_vector(left), &offset_vector(right));

    let mut pairs = Vec::new();
    for (i, rights) in matching.iter().enumerate() {
        for &j in rights {
            pairs.push(Pair {
                left: i,
                right: j,
                point: Point::new(
                    left[i].x + (right[j].x - left[i].x) * offset,
                    left[i].y + (right[j].y - left[i].y) * offset,
                ),
            });
        }
    }
    reduce(&pairs, left, right)
}

/// Interpolates an open curve. Falls back to the left curve when either
/// side has fewer than two vertices.
pub(super) fn interpolate_polyline(left: &[f64], right: &[f64], offset: f64) -> Vec<f64> {
    let (l, r) = (to_points(left), to_points(right));
    if l.len() < 2 || r.len() < 2 {
        return left.to_vec();
    }
    let result = interpolate_curves(&l, &r, offset);
    if result.len() < 2 {
        return left.to_vec();
    }
    to_flat(&result)
}

/// Interpolates a closed curve by closing both sides, matching them as
/// open curves and dropping the closing vertex again.
pub(super) fn interpolate_polygon(left: &[f64], right: &[f64], offset: f64) -> Vec<f64> {
    let (mut l, mut r) = (to_points(left), to_points(right));
    if l.len() < 3 || r.len() < 3 {
        return left.to_vec();
    }
    l.push(l[0]);
    r.push(r[0]);

    let mut result = interpolate_curves(&l, &r, offset);
    result.pop();
    if result.len() < 3 {
        return left.to_vec();
    }
    to_flat(&result)
}
