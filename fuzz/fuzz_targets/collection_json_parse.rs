//! Fuzz target for serialized collection parsing and import.
//!
//! Parsed input is imported into a small task so geometry validation and
//! track construction see arbitrary data too.

#![no_main]

use std::collections::{BTreeMap, BTreeSet};

use framelabel::collection::Collection;
use framelabel::format::io_json::from_json_slice;
use framelabel::schema::{FrameSize, Label, LabelType, TaskMeta};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(parsed) = from_json_slice(data) else {
        return;
    };

    let mut collection = Collection::from_task(TaskMeta {
        name: "fuzz".into(),
        start_frame: 0,
        stop_frame: 1000,
        frame_size: FrameSize {
            width: 1920,
            height: 1080,
        },
        frame_sizes: BTreeMap::new(),
        deleted_frames: BTreeSet::new(),
        labels: vec![Label::new(1u64, "object", LabelType::Any)],
    });
    if collection.import(&parsed).is_ok() {
        let _ = collection.export();
        let _ = collection.statistics();
    }
});
