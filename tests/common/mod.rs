#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use framelabel::collection::{Collection, PutOptions};
use framelabel::format::{ClientId, SerializedCollection, ShapeType};
use framelabel::schema::{AttributeSpec, FrameSize, InputType, Label, LabelType, TaskMeta};
use framelabel::state::ObjectState;

pub const CAR: u64 = 1;
pub const PERSON: u64 = 2;
pub const HEAD: u64 = 3;
pub const HAND: u64 = 4;
pub const POSE: u64 = 20;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A 100-frame task with a free-form `car` label and a two-point
/// `person` skeleton.
pub fn task() -> TaskMeta {
    let pose = AttributeSpec {
        id: POSE.into(),
        name: "pose".into(),
        input_type: InputType::Select,
        mutable: true,
        values: vec!["standing".into(), "sitting".into()],
        default_value: None,
    };
    TaskMeta {
        name: "integration".into(),
        start_frame: 0,
        stop_frame: 99,
        frame_size: FrameSize {
            width: 640,
            height: 480,
        },
        frame_sizes: BTreeMap::new(),
        deleted_frames: BTreeSet::new(),
        labels: vec![
            Label::new(CAR, "car", LabelType::Any).with_attribute(pose),
            Label::new(PERSON, "person", LabelType::Skeleton)
                .with_sublabel(Label::new(HEAD, "head", LabelType::Points))
                .with_sublabel(Label::new(HAND, "hand", LabelType::Points)),
        ],
    }
}

pub fn collection() -> Collection {
    Collection::from_task(task())
}

pub fn rect(frame: u32, points: [f64; 4]) -> ObjectState {
    ObjectState::shape(ShapeType::Rectangle, frame, CAR, points.to_vec())
}

pub fn rect_track(frame: u32, points: [f64; 4]) -> ObjectState {
    ObjectState::track(ShapeType::Rectangle, frame, CAR, points.to_vec())
}

pub fn skeleton(frame: u32, head: [f64; 2], hand: [f64; 2]) -> ObjectState {
    ObjectState::shape(ShapeType::Skeleton, frame, PERSON, Vec::new()).with_elements(vec![
        ObjectState::shape(ShapeType::Points, frame, HEAD, head.to_vec()),
        ObjectState::shape(ShapeType::Points, frame, HAND, hand.to_vec()),
    ])
}

pub fn put_one(collection: &mut Collection, state: ObjectState) -> ClientId {
    collection
        .put(&[state], PutOptions::default())
        .expect("put object")[0]
}

/// Adds a keyframe with the given box to a track.
pub fn keyframe(collection: &mut Collection, id: ClientId, frame: u32, points: [f64; 4]) {
    let mut state = collection.object_state(id, frame).expect("track state");
    state.set_points(points.to_vec());
    state.set_outside(false);
    collection.save(&state).expect("save keyframe");
}

/// Export with client ids removed, for comparisons across imports.
pub fn anonymized(mut data: SerializedCollection) -> SerializedCollection {
    fn shapes(list: &mut [framelabel::format::SerializedShape]) {
        for shape in list {
            shape.client_id = None;
            shapes(&mut shape.elements);
        }
    }
    fn tracks(list: &mut [framelabel::format::SerializedTrack]) {
        for track in list {
            track.client_id = None;
            tracks(&mut track.elements);
        }
    }
    shapes(&mut data.shapes);
    tracks(&mut data.tracks);
    for tag in &mut data.tags {
        tag.client_id = None;
    }
    data
}
