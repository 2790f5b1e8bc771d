//! Hit-testing and frame search.

use serde::Serialize;

use super::filter::is_difficult;
use super::Collection;
use crate::annotations::Annotation;
use crate::error::FramelabelError;
use crate::format::{ClientId, ObjectType, ShapeType};
use crate::geometry::HitTestable;
use crate::state::ObjectState;

/// The object closest to a clicked point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Selection {
    pub client_id: ClientId,
    pub distance: f64,
}

/// What [`Collection::search`] looks for.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchParams {
    /// Filter rules; empty matches any visible object.
    pub rules: Vec<serde_json::Value>,
    /// Look for a frame without visible objects instead.
    pub empty: bool,
}

impl SearchParams {
    pub fn filtered(rules: Vec<serde_json::Value>) -> Self {
        Self { rules, empty: false }
    }

    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            empty: true,
        }
    }
}

fn state_distance(state: &ObjectState, x: f64, y: f64) -> Option<f64> {
    match state.shape_type? {
        ShapeType::Skeleton => state
            .elements
            .iter()
            .filter(|e| !e.outside && !e.hidden)
            .filter_map(|e| state_distance(e, x, y))
            .min_by(f64::total_cmp),
        shape_type => shape_type.distance(&state.points, x, y, state.rotation),
    }
}

impl Collection {
    /// Picks the visible state under `(x, y)` with the smallest distance.
    /// Ties keep the earlier state.
    pub fn select(&self, states: &[ObjectState], x: f64, y: f64) -> Option<Selection> {
        let mut best: Option<Selection> = None;
        for state in states {
            if state.object_type == ObjectType::Tag || state.outside || state.hidden {
                continue;
            }
            let (Some(client_id), Some(distance)) = (state.client_id, state_distance(state, x, y)) else {
                continue;
            };
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(Selection { client_id, distance });
            }
        }
        best
    }

    /// Non-outside states at `frame`; tracks are included when
    /// `include_track` allows it.
    fn visible_states(
        &self,
        frame: u32,
        include_track: impl Fn(&Annotation) -> bool,
    ) -> Result<Vec<ObjectState>, FramelabelError> {
        let mut states = Vec::new();
        for annotation in self.store.shapes_at(frame).chain(self.store.tags_at(frame)) {
            states.push(self.build_state(annotation, frame)?);
        }
        for track in self.store.tracks() {
            if include_track(track) {
                states.push(self.build_state(track, frame)?);
            }
        }
        states.retain(|s| !s.outside);
        Ok(states)
    }

    fn frame_matches(
        &self,
        frame: u32,
        rules: &[serde_json::Value],
        include_track: impl Fn(&Annotation) -> bool,
    ) -> Result<bool, FramelabelError> {
        let states = self.visible_states(frame, include_track)?;
        Ok(!self.apply_filter(states, rules).is_empty())
    }

    /// Frames between `from` and `to` (inclusive) where something can
    /// change: both ends, shape and tag anchors and track keyframes.
    fn event_frames(&self, from: u32, to: u32) -> Vec<u32> {
        let (low, high) = (from.min(to), from.max(to));
        let mut frames = self.store.anchored_frames();
        for track in self.store.tracks() {
            for id in self.store.tree_ids(track.client_id) {
                if let Some(keyframes) = self.store.get(id).and_then(|a| a.keyframes()) {
                    frames.extend(keyframes.range(low..=high).map(|(f, _)| *f));
                }
            }
        }
        frames.insert(from);
        frames.insert(to);

        let mut frames: Vec<u32> = frames.into_iter().filter(|f| (low..=high).contains(f)).collect();
        if from > to {
            frames.reverse();
        }
        frames
    }

    /// Finds the nearest frame from `from` towards `to` (both inclusive)
    /// that satisfies `params`. Deleted frames are skipped.
    pub fn search(&self, from: u32, to: u32, params: &SearchParams) -> Result<Option<u32>, FramelabelError> {
        if params.empty {
            return self.search_empty(from, to);
        }

        let rules = params.rules.as_slice();
        if !is_difficult(rules) {
            for frame in self.event_frames(from, to) {
                if self.meta.is_deleted(frame) {
                    continue;
                }
                let at_bound = frame == from || frame == to;
                let include = |track: &Annotation| at_bound || self.has_keyframe_at(track, frame);
                if self.frame_matches(frame, rules, include)? {
                    return Ok(Some(frame));
                }
            }
            return Ok(None);
        }

        // sizes change between keyframes: walk events, then bisect the gap
        // in front of the first matching one
        let mut previous_miss: Option<u32> = None;
        for frame in self.event_frames(from, to) {
            let matches = !self.meta.is_deleted(frame) && self.frame_matches(frame, rules, |_| true)?;
            if !matches {
                previous_miss = Some(frame);
                continue;
            }
            let Some(miss) = previous_miss else {
                return Ok(Some(frame));
            };
            return Ok(Some(self.bisect(miss, frame, rules)?));
        }
        Ok(None)
    }

    fn bisect(&self, mut miss: u32, mut hit: u32, rules: &[serde_json::Value]) -> Result<u32, FramelabelError> {
        while miss.abs_diff(hit) > 1 {
            let middle = if miss < hit {
                miss + (hit - miss) / 2
            } else {
                hit + (miss - hit) / 2
            };
            if !self.meta.is_deleted(middle) && self.frame_matches(middle, rules, |_| true)? {
                hit = middle;
            } else {
                miss = middle;
            }
        }
        Ok(hit)
    }

    fn search_empty(&self, from: u32, to: u32) -> Result<Option<u32>, FramelabelError> {
        let frames: Box<dyn Iterator<Item = u32>> = if from <= to {
            Box::new(from..=to)
        } else {
            Box::new((to..=from).rev())
        };
        for frame in frames {
            if self.meta.is_deleted(frame) {
                continue;
            }
            if self.visible_states(frame, |_| true)?.is_empty() {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    fn has_keyframe_at(&self, track: &Annotation, frame: u32) -> bool {
        self.store
            .tree_ids(track.client_id)
            .into_iter()
            .filter_map(|id| self.store.get(id))
            .filter_map(|a| a.keyframes())
            .any(|k| k.contains_key(&frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{FilterRecord, PredicateFilter, PutOptions};
    use crate::schema::{FrameSize, Label, LabelType, TaskMeta};
    use serde_json::json;
    use std::collections::{BTreeMap, BTreeSet};

    fn task() -> TaskMeta {
        TaskMeta {
            name: "query".into(),
            start_frame: 0,
            stop_frame: 100,
            frame_size: FrameSize {
                width: 500,
                height: 500,
            },
            frame_sizes: BTreeMap::new(),
            deleted_frames: BTreeSet::from([12]),
            labels: vec![
                Label::new(1u64, "car", LabelType::Any),
                Label::new(2u64, "person", LabelType::Any),
            ],
        }
    }

    /// Matches records whose box is wider than the threshold in the rule,
    /// or whose label equals the rule string.
    fn rule_filter() -> PredicateFilter<impl Fn(&FilterRecord, &[serde_json::Value]) -> bool> {
        PredicateFilter(|record: &FilterRecord, rules: &[serde_json::Value]| {
            rules.iter().all(|rule| match rule.get(">") {
                Some(args) => record.width.unwrap_or_default() > args[1].as_f64().unwrap_or_default(),
                None => rule.as_str().is_some_and(|label| record.label == label),
            })
        })
    }

    fn rect(frame: u32, label: u64, x: f64, size: f64) -> ObjectState {
        ObjectState::shape(ShapeType::Rectangle, frame, label, vec![x, x, x + size, x + size])
    }

    #[test]
    fn test_select_prefers_nearest() {
        let mut collection = Collection::from_task(task());
        collection
            .put(&[rect(0, 1, 0.0, 100.0), rect(0, 1, 40.0, 20.0)], PutOptions::default())
            .unwrap();
        let states = collection.get(0, false, &[]).unwrap();

        let selected = collection.select(&states, 50.0, 50.0).unwrap();
        assert_eq!(Some(selected.client_id), states[1].client_id());
        assert!(collection.select(&states, 400.0, 400.0).is_none());
    }

    #[test]
    fn test_select_skips_hidden() {
        let mut collection = Collection::from_task(task());
        collection.put(&[rect(0, 1, 0.0, 100.0)], PutOptions::default()).unwrap();
        let mut state = collection.get(0, false, &[]).unwrap().remove(0);
        state.set_hidden(true);
        let state = collection.save(&state).unwrap();
        assert!(collection.select(&[state], 50.0, 50.0).is_none());
    }

    #[test]
    fn test_search_by_label_both_directions() {
        let mut collection = Collection::from_task(task()).with_filter(rule_filter());
        collection
            .put(
                &[rect(3, 1, 0.0, 10.0), rect(8, 2, 0.0, 10.0), rect(15, 2, 0.0, 10.0)],
                PutOptions::default(),
            )
            .unwrap();

        let person = SearchParams::filtered(vec![json!("person")]);
        assert_eq!(collection.search(0, 100, &person).unwrap(), Some(8));
        assert_eq!(collection.search(100, 0, &person).unwrap(), Some(15));
        assert_eq!(collection.search(9, 14, &person).unwrap(), None);
    }

    #[test]
    fn test_search_empty_skips_deleted_frames() {
        let mut collection = Collection::from_task(task());
        let shapes: Vec<ObjectState> = (10..=11).chain(13..=14).map(|f| rect(f, 1, 0.0, 10.0)).collect();
        collection.put(&shapes, PutOptions::default()).unwrap();
        assert_eq!(collection.search(10, 20, &SearchParams::empty()).unwrap(), Some(15));
        assert_eq!(collection.search(14, 0, &SearchParams::empty()).unwrap(), Some(9));
    }

    #[test]
    fn test_search_bisects_size_rules() {
        let mut collection = Collection::from_task(task()).with_filter(rule_filter());
        let track = ObjectState::track(ShapeType::Rectangle, 0, 1u64, vec![0.0, 0.0, 10.0, 10.0]);
        let id = collection.put(&[track], PutOptions::default()).unwrap()[0];
        let mut end = collection.object_state(id, 40).unwrap();
        end.set_points(vec![0.0, 0.0, 50.0, 50.0]);
        end.set_outside(false);
        collection.save(&end).unwrap();

        // width grows by one pixel per frame: 10 + f
        let wide = SearchParams::filtered(vec![json!({">": [{"var": "width"}, 30]})]);
        assert_eq!(collection.search(0, 40, &wide).unwrap(), Some(21));
    }
}
