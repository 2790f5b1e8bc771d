#![allow(dead_code)]

use std::collections::BTreeSet;

use framelabel::format::{
    SerializedAttribute, SerializedCollection, SerializedShape, SerializedTag, SerializedTrack,
    SerializedTrackedShape, ShapeType,
};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Label and attribute ids of `common::task()`.
pub const CAR: u64 = 1;
pub const POSE: u64 = 20;
pub const STOP_FRAME: u32 = 99;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A row-major 0/1 bitmap with its dimensions.
pub fn arb_bitmap(max_width: usize, max_height: usize) -> BoxedStrategy<(usize, usize, Vec<u8>)> {
    (1..=max_width, 1..=max_height)
        .prop_flat_map(|(w, h)| {
            (
                Just(w),
                Just(h),
                prop::collection::vec(prop_oneof![Just(0u8), Just(1u8)], w * h),
            )
        })
        .boxed()
}

/// Complete mask points (runs followed by the box) placed at a random
/// offset inside a 64x64 frame.
pub fn arb_mask_points() -> BoxedStrategy<Vec<f64>> {
    (arb_bitmap(16, 16), 0i64..48, 0i64..48)
        .prop_map(|((w, h, bitmap), left, top)| {
            let mut points: Vec<f64> = framelabel::mask::mask_to_rle(&bitmap)
                .into_iter()
                .map(f64::from)
                .collect();
            points.extend([
                left as f64,
                top as f64,
                (left + w as i64 - 1) as f64,
                (top + h as i64 - 1) as f64,
            ]);
            points
        })
        .boxed()
}

/// Coordinates exactly representable in JSON, inside a 640x480 frame.
fn arb_coord(max: u32) -> impl Strategy<Value = f64> {
    (0..=max * 2).prop_map(|v| f64::from(v) / 2.0)
}

/// An axis-aligned box at least 4 px wide and high.
fn arb_box() -> impl Strategy<Value = Vec<f64>> {
    (arb_coord(600), arb_coord(440), 4u32..40, 4u32..40)
        .prop_map(|(x, y, w, h)| vec![x, y, x + f64::from(w), y + f64::from(h)])
}

fn arb_pose() -> impl Strategy<Value = Vec<SerializedAttribute>> {
    prop_oneof![
        Just(Vec::new()),
        Just(vec![SerializedAttribute::new(POSE, "standing")]),
        Just(vec![SerializedAttribute::new(POSE, "sitting")]),
    ]
}

fn arb_shape() -> impl Strategy<Value = SerializedShape> {
    (0..=STOP_FRAME, arb_box(), -3i32..3, any::<bool>(), arb_pose()).prop_map(
        |(frame, points, z_order, occluded, attributes)| {
            let mut shape = SerializedShape::new(ShapeType::Rectangle, frame, CAR, points);
            shape.z_order = z_order;
            shape.occluded = occluded;
            shape.attributes = attributes;
            shape
        },
    )
}

fn arb_track() -> impl Strategy<Value = SerializedTrack> {
    prop::collection::btree_set(0..=STOP_FRAME, 1..6)
        .prop_flat_map(|frames: BTreeSet<u32>| {
            let n = frames.len();
            (
                Just(frames),
                prop::collection::vec((arb_box(), any::<bool>(), arb_pose()), n),
            )
        })
        .prop_map(|(frames, keyframes)| {
            let shapes: Vec<SerializedTrackedShape> = frames
                .into_iter()
                .zip(keyframes)
                .map(|(frame, (points, outside, attributes))| {
                    let mut shape = SerializedTrackedShape::new(ShapeType::Rectangle, frame, points);
                    shape.outside = outside;
                    shape.attributes = attributes;
                    shape
                })
                .collect();
            let first = shapes.first().map(|s| s.frame).unwrap_or_default();
            SerializedTrack::new(first, CAR, shapes)
        })
}

fn arb_tag() -> impl Strategy<Value = SerializedTag> {
    (0..=STOP_FRAME).prop_map(|frame| SerializedTag::new(frame, CAR))
}

/// Shapes, tracks and tags of the `car` label.
pub fn arb_collection(max_objects: usize) -> BoxedStrategy<SerializedCollection> {
    (
        prop::collection::vec(arb_shape(), 0..=max_objects),
        prop::collection::vec(arb_track(), 0..=max_objects),
        prop::collection::vec(arb_tag(), 0..=max_objects),
    )
        .prop_map(|(shapes, tracks, tags)| SerializedCollection {
            shapes,
            tracks,
            tags,
        })
        .boxed()
}
