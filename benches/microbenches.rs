//! Criterion microbenches for mask encoding and track interpolation.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use framelabel::annotations::{Keyframes, Position, TrackedShape};
use framelabel::format::{ClientId, ShapeType};
use framelabel::interpolation::position_at;
use framelabel::mask::{crop_mask, mask_to_rle, rle_to_mask};

const WIDTH: usize = 256;
const HEIGHT: usize = 256;

/// A filled disc in the middle of the bitmap.
fn disc_bitmap() -> Vec<u8> {
    let (cx, cy, r) = (WIDTH as f64 / 2.0, HEIGHT as f64 / 2.0, WIDTH as f64 / 3.0);
    (0..WIDTH * HEIGHT)
        .map(|i| {
            let (x, y) = ((i % WIDTH) as f64, (i / WIDTH) as f64);
            u8::from((x - cx).powi(2) + (y - cy).powi(2) <= r * r)
        })
        .collect()
}

fn bench_rle(c: &mut Criterion) {
    let bitmap = disc_bitmap();
    let rle = mask_to_rle(&bitmap);

    let mut group = c.benchmark_group("mask_rle");
    group.throughput(Throughput::Elements(bitmap.len() as u64));

    group.bench_function("mask_to_rle", |b| {
        b.iter(|| black_box(mask_to_rle(black_box(&bitmap))))
    });
    group.bench_function("rle_to_mask", |b| {
        b.iter(|| black_box(rle_to_mask(black_box(&rle), WIDTH, HEIGHT)))
    });

    let mut points: Vec<f64> = rle.iter().map(|r| f64::from(*r)).collect();
    points.extend([0.0, 0.0, (WIDTH - 1) as f64, (HEIGHT - 1) as f64]);
    group.bench_function("crop_mask", |b| {
        b.iter(|| black_box(crop_mask(black_box(&points), 1920, 1080)))
    });

    group.finish();
}

fn polygon(n: usize, radius: f64, phase: f64) -> Vec<f64> {
    (0..n)
        .flat_map(|i| {
            let a = phase + i as f64 * std::f64::consts::TAU / n as f64;
            [500.0 + radius * a.cos(), 500.0 + radius * a.sin()]
        })
        .collect()
}

fn keyframe(points: Vec<f64>) -> TrackedShape {
    TrackedShape {
        position: Position {
            points,
            ..Position::default()
        },
        ..TrackedShape::default()
    }
}

fn bench_polygon_interpolation(c: &mut Criterion) {
    let mut keyframes = Keyframes::new();
    keyframes.insert(0, keyframe(polygon(24, 100.0, 0.0)));
    keyframes.insert(100, keyframe(polygon(40, 160.0, 0.3)));

    let mut group = c.benchmark_group("interpolation");
    group.throughput(Throughput::Elements(99));

    group.bench_function("polygon_24_to_40", |b| {
        b.iter(|| {
            for frame in 1..100 {
                let position = position_at(ClientId(1), ShapeType::Polygon, black_box(&keyframes), frame);
                let _ = black_box(position);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_rle, bench_polygon_interpolation);
criterion_main!(benches);
