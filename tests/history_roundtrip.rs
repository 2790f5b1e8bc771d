use framelabel::collection::PutOptions;
use framelabel::format::SerializedCollection;
use framelabel::history::{HistoryAction, HistoryConfig};

mod common;

use common::*;

fn canonical(mut data: SerializedCollection) -> SerializedCollection {
    data.shapes.sort_by_key(|s| s.client_id);
    data.tracks.sort_by_key(|t| t.client_id);
    data.tags.sort_by_key(|t| t.client_id);
    data
}

#[test]
fn undo_all_restores_the_imported_state_and_redo_replays_it() {
    let mut collection = collection();
    let data: SerializedCollection = serde_json::from_value(serde_json::json!({
        "shapes": [
            { "type": "rectangle", "frame": 1, "label_id": 1, "points": [0.0, 0.0, 50.0, 50.0] },
            { "type": "polygon", "frame": 1, "label_id": 1, "points": [100.0, 100.0, 150.0, 100.0, 150.0, 150.0] }
        ],
        "tracks": [{
            "frame": 0,
            "label_id": 1,
            "shapes": [
                { "type": "rectangle", "frame": 0, "points": [0.0, 0.0, 10.0, 10.0] },
                { "type": "rectangle", "frame": 20, "points": [20.0, 20.0, 30.0, 30.0] }
            ]
        }]
    }))
    .unwrap();
    collection.import(&data).unwrap();
    let initial = canonical(collection.export());
    assert!(!collection.history().can_undo());

    let states = collection.get(1, false, &[]).unwrap();
    let (rectangle, polygon, track) = (&states[0], &states[1], &states[2]);

    let mut moved = rectangle.clone();
    moved.set_points(vec![5.0, 5.0, 55.0, 55.0]);
    moved.set_z_order(3);
    collection.save(&moved).unwrap();
    collection.group(&[rectangle.clone(), polygon.clone()], false).unwrap();
    collection.split(track, 10).unwrap();
    collection.remove(polygon, false).unwrap();
    put_one(&mut collection, rect(4, [1.0, 1.0, 40.0, 40.0]));

    let edited = canonical(collection.export());
    assert_ne!(edited, initial);

    let steps = collection.history().undo_len();
    collection.undo(steps);
    assert_eq!(canonical(collection.export()), initial);
    assert!(!collection.history().can_undo());

    collection.redo(steps);
    assert_eq!(canonical(collection.export()), edited);
    assert!(!collection.history().can_redo());
}

#[test]
fn undo_reports_affected_objects() {
    let mut collection = collection();
    let id = put_one(&mut collection, rect(0, [0.0, 0.0, 20.0, 20.0]));

    let mut state = collection.object_state(id, 0).unwrap();
    state.set_occluded(true);
    collection.save(&state).unwrap();

    assert_eq!(collection.undo(1), vec![id]);
    assert!(!collection.object_state(id, 0).unwrap().occluded());
    assert_eq!(collection.redo(1), vec![id]);
    assert!(collection.object_state(id, 0).unwrap().occluded());
}

#[test]
fn new_edit_drops_redo_stack() {
    let mut collection = collection();
    put_one(&mut collection, rect(0, [0.0, 0.0, 20.0, 20.0]));
    collection.undo(1);
    assert!(collection.history().can_redo());

    put_one(&mut collection, rect(1, [0.0, 0.0, 20.0, 20.0]));
    assert!(!collection.history().can_redo());
}

#[test]
fn underlying_pixel_removal_respects_its_quota() {
    let mut config = HistoryConfig::default();
    config.quotas.insert(HistoryAction::RemovedUnderlyingPixels, 2);
    let mut collection = collection().with_history_config(config);

    let mask = |z: i32| {
        framelabel::state::ObjectState::shape(
            framelabel::format::ShapeType::Mask,
            0,
            CAR,
            // a 4x4 mask fully set, placed at (0, 0)
            vec![0.0, 16.0, 0.0, 0.0, 3.0, 3.0],
        )
        .with_z_order(z)
    };
    collection.put(&[mask(0)], PutOptions::default()).unwrap();
    for z in 1..=4 {
        collection
            .put(
                &[mask(z)],
                PutOptions {
                    remove_underlying_pixels: true,
                },
            )
            .unwrap();
    }

    let entries = collection.history().entries();
    let removals = entries
        .undo
        .iter()
        .filter(|(action, _)| *action == HistoryAction::RemovedUnderlyingPixels)
        .count();
    assert_eq!(removals, 2);
}
