//! The annotation collection of one labeling session.
//!
//! A [`Collection`] owns every annotation, indexes shapes and tags by frame,
//! keeps tracks in a flat list and records every mutation in its
//! [`History`]. Reads go through [`ObjectState`] projections; writes go
//! through [`Collection::save`] and the structural operations.

mod clear;
mod create;
pub mod filter;
mod query;
mod save;
mod store;
mod structure;

pub use create::PutOptions;
pub use filter::{AcceptAll, AnnotationsFilter, FilterRecord, PredicateFilter};
pub use query::{SearchParams, Selection};

use std::collections::{BTreeMap, BTreeSet};

use rand::{rngs::StdRng, RngExt, SeedableRng};

use crate::annotations::{check_points, Annotation, Attributable, Keyframes, Position, TrackedShape};
use crate::error::FramelabelError;
use crate::format::{
    ClientId, LabelId, ObjectType, SerializedAttribute, SerializedCollection, SerializedShape, SerializedTag,
    SerializedTrack, SerializedTrackedShape, ShapeType,
};
use crate::geometry::BBoxXYXY;
use crate::history::{History, HistoryAction, HistoryConfig, Restore};
use crate::interpolation::{position_at, KeyframesInfo};
use crate::mask;
use crate::schema::{FrameMeta, Label, LabelSchema, TaskMeta};
use crate::state::{ChangeSet, ObjectState};

use store::ObjectStore;

/// Colors handed out to groups.
const GROUP_PALETTE: [&str; 16] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6", "#bcf60c",
    "#fabebe", "#008080", "#e6beff", "#9a6324", "#800000", "#aaffc3", "#000075",
];

pub struct Collection {
    schema: LabelSchema,
    meta: Box<dyn FrameMeta>,
    store: ObjectStore,
    history: History,
    filter: Box<dyn AnnotationsFilter>,
    groups_max: u32,
    group_colors: BTreeMap<u32, String>,
    color_seed: Option<u64>,
    flushed: bool,
}

impl Collection {
    pub fn new(schema: LabelSchema, meta: impl FrameMeta + 'static) -> Self {
        Self {
            schema,
            meta: Box::new(meta),
            store: ObjectStore::default(),
            history: History::new(HistoryConfig::default()),
            filter: Box::new(AcceptAll),
            groups_max: 0,
            group_colors: BTreeMap::new(),
            color_seed: None,
            flushed: false,
        }
    }

    /// Builds a collection from a task description.
    pub fn from_task(task: TaskMeta) -> Self {
        let schema = task.schema();
        Self::new(schema, task)
    }

    pub fn with_history_config(mut self, config: HistoryConfig) -> Self {
        self.history = History::new(config);
        self
    }

    pub fn with_filter(mut self, filter: impl AnnotationsFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Makes group colors reproducible.
    pub fn with_color_seed(mut self, seed: u64) -> Self {
        self.color_seed = Some(seed);
        self
    }

    pub fn schema(&self) -> &LabelSchema {
        &self.schema
    }

    pub fn meta(&self) -> &dyn FrameMeta {
        self.meta.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Largest group id handed out so far.
    pub fn groups_max(&self) -> u32 {
        self.groups_max
    }

    /// True after a full [`clear`](Self::clear) wiped the collection.
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// The stored annotation behind a client id, removed or not.
    pub fn annotation(&self, client_id: ClientId) -> Option<&Annotation> {
        self.store.get(client_id)
    }

    pub(crate) fn label(&self, label_id: LabelId) -> Result<&Label, FramelabelError> {
        self.schema
            .label(label_id)
            .ok_or_else(|| FramelabelError::data(format!("unknown label {}", label_id)))
    }

    pub(crate) fn live(&self, client_id: ClientId) -> Result<&Annotation, FramelabelError> {
        match self.store.get(client_id) {
            Some(a) if !a.removed => Ok(a),
            Some(_) => Err(FramelabelError::argument(format!("object {} has been removed", client_id))),
            None => Err(FramelabelError::scripting(format!("object {} does not exist", client_id))),
        }
    }

    pub(crate) fn state_id(state: &ObjectState) -> Result<ClientId, FramelabelError> {
        state
            .client_id
            .ok_or_else(|| FramelabelError::argument("the state does not belong to a collection object"))
    }

    /// Splits attribute values into immutable and mutable ones for `label`.
    pub(crate) fn split_attributes(
        label: &Label,
        values: &BTreeMap<crate::format::AttributeId, String>,
    ) -> (
        BTreeMap<crate::format::AttributeId, String>,
        BTreeMap<crate::format::AttributeId, String>,
    ) {
        values
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .partition(|(k, _)| !label.attribute(*k).is_some_and(|spec| spec.mutable))
    }

    /// Applies `edit` to the store and records one history entry holding
    /// snapshots of `ids` before and after. The store is rolled back if
    /// `edit` fails.
    pub(crate) fn commit(
        &mut self,
        action: HistoryAction,
        ids: &[ClientId],
        frame: u32,
        edit: impl FnOnce(&mut ObjectStore) -> Result<(), FramelabelError>,
    ) -> Result<(), FramelabelError> {
        let before = self.store.snapshot(ids);
        if let Err(err) = edit(&mut self.store) {
            self.store.restore(&before);
            return Err(err);
        }
        for id in ids {
            self.store.sync_skeleton_keyframes(*id);
        }
        let after = self.store.snapshot(ids);
        self.history.record(action, before, after, ids.to_vec(), frame);
        Ok(())
    }

    /// Soft-removes `removed` (with their elements) and inserts `created`,
    /// recording both in one history entry.
    pub(crate) fn commit_replacement(
        &mut self,
        action: HistoryAction,
        removed: &[ClientId],
        created: Vec<Annotation>,
        frame: u32,
    ) {
        let mut ids: Vec<ClientId> = removed
            .iter()
            .flat_map(|id| self.store.tree_ids(*id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut before = self.store.snapshot(&ids);
        for id in removed {
            self.store.remove_tree(*id);
        }
        let mut after = self.store.snapshot(&ids);

        for annotation in created {
            ids.push(annotation.client_id);
            let mut unborn = annotation.clone();
            unborn.removed = true;
            before.push(unborn);
            after.push(annotation.clone());
            self.store.insert(annotation);
        }

        tracing::debug!(?action, frame, objects = ids.len(), "Structural edit");
        self.history.record(action, before, after, ids, frame);
    }

    /// Adds serialized annotations to the collection.
    ///
    /// Every object gets a fresh client id. Labels and point arity are
    /// checked for the whole payload before anything is stored; a bad
    /// payload is a [`FramelabelError::Data`] and leaves the collection
    /// untouched. Masks are cropped to the frame, and masks with no pixel
    /// left are dropped with a warning, as are tracks without keyframes.
    /// Import is not recorded in the history.
    pub fn import(&mut self, data: &SerializedCollection) -> Result<Vec<ClientId>, FramelabelError> {
        self.check_import(data)?;

        let mut created = Vec::new();
        for shape in &data.shapes {
            if let Some(id) = self.import_shape(shape, None)? {
                created.push(id);
            }
        }
        for track in &data.tracks {
            if let Some(id) = self.import_track(track, None)? {
                created.push(id);
            }
        }
        for tag in &data.tags {
            created.push(self.import_tag(tag)?);
        }
        tracing::debug!(objects = created.len(), "Imported annotations");
        Ok(created)
    }

    fn check_import(&self, data: &SerializedCollection) -> Result<(), FramelabelError> {
        fn check_geometry(shape_type: ShapeType, points: &[f64], frame: u32) -> Result<(), FramelabelError> {
            check_points(shape_type, points)
                .map_err(|err| FramelabelError::data(format!("imported object at frame {}: {}", frame, err)))
        }
        fn check_shapes(collection: &Collection, shapes: &[SerializedShape]) -> Result<(), FramelabelError> {
            for shape in shapes {
                collection.label(shape.label_id)?;
                check_geometry(shape.shape_type, &shape.points, shape.frame)?;
                check_shapes(collection, &shape.elements)?;
            }
            Ok(())
        }
        fn check_tracks(collection: &Collection, tracks: &[SerializedTrack]) -> Result<(), FramelabelError> {
            for track in tracks {
                collection.label(track.label_id)?;
                for shape in &track.shapes {
                    check_geometry(shape.shape_type, &shape.points, shape.frame)?;
                }
                check_tracks(collection, &track.elements)?;
            }
            Ok(())
        }

        check_shapes(self, &data.shapes)?;
        check_tracks(self, &data.tracks)?;
        for tag in &data.tags {
            self.label(tag.label_id)?;
        }
        Ok(())
    }

    fn attributes_from(values: &[SerializedAttribute]) -> BTreeMap<crate::format::AttributeId, String> {
        values.iter().map(|a| (a.spec_id, a.value.clone())).collect()
    }

    /// Crops imported mask points to the frame; `None` when nothing is left.
    fn imported_points(&self, shape_type: ShapeType, points: &[f64], frame: u32) -> Option<Vec<f64>> {
        if shape_type != ShapeType::Mask {
            return Some(points.to_vec());
        }
        let Some(size) = self.meta.frame_size(frame) else {
            return Some(points.to_vec());
        };
        let cropped = mask::crop_mask(points, size.width, size.height);
        if mask::is_void(&cropped) {
            tracing::warn!(frame, "Dropping imported mask without pixels inside the frame");
            return None;
        }
        Some(cropped)
    }

    fn import_shape(
        &mut self,
        shape: &SerializedShape,
        parent: Option<ClientId>,
    ) -> Result<Option<ClientId>, FramelabelError> {
        let Some(points) = self.imported_points(shape.shape_type, &shape.points, shape.frame) else {
            return Ok(None);
        };
        let label = self.label(shape.label_id)?;
        let mut attributes = label.default_attributes();
        attributes.extend(Self::attributes_from(&shape.attributes));

        let client_id = ClientId::fresh();
        let mut annotation = Annotation::new_shape(
            client_id,
            shape.label_id,
            shape.frame,
            shape.shape_type,
            Position {
                points,
                occluded: shape.occluded,
                outside: shape.outside,
                rotation: shape.rotation,
                z_order: shape.z_order,
            },
        );
        annotation.server_id = shape.id;
        annotation.group = shape.group;
        annotation.source = shape.source;
        annotation.attributes = attributes;
        annotation.parent = parent;

        let mut elements = Vec::with_capacity(shape.elements.len());
        for element in &shape.elements {
            if let Some(id) = self.import_shape(element, Some(client_id))? {
                elements.push(id);
            }
        }
        annotation.elements = elements;

        self.groups_max = self.groups_max.max(shape.group);
        self.store.insert(annotation);
        Ok(Some(client_id))
    }

    fn import_track(
        &mut self,
        track: &SerializedTrack,
        parent: Option<ClientId>,
    ) -> Result<Option<ClientId>, FramelabelError> {
        let label = self.label(track.label_id)?.clone();
        let client_id = ClientId::fresh();

        let mut elements = Vec::with_capacity(track.elements.len());
        for element in &track.elements {
            if let Some(id) = self.import_track(element, Some(client_id))? {
                elements.push(id);
            }
        }

        let shape_type = if !track.elements.is_empty() {
            ShapeType::Skeleton
        } else if let Some(first) = track.shapes.first() {
            first.shape_type
        } else {
            tracing::warn!(label = %label.name, frame = track.frame, "Dropping imported track without keyframes");
            return Ok(None);
        };

        let mut keyframes: Keyframes = track
            .shapes
            .iter()
            .filter_map(|s| {
                let points = self.imported_points(s.shape_type, &s.points, s.frame)?;
                Some((
                    s.frame,
                    TrackedShape {
                        server_id: s.id,
                        position: Position {
                            points,
                            occluded: s.occluded,
                            outside: s.outside,
                            rotation: s.rotation,
                            z_order: s.z_order,
                        },
                        attributes: Self::attributes_from(&s.attributes),
                    },
                ))
            })
            .collect();
        if shape_type == ShapeType::Skeleton {
            for id in &elements {
                if let Some(frames) = self.store.get(*id).and_then(|e| e.keyframes()) {
                    for frame in frames.keys() {
                        keyframes.entry(*frame).or_default();
                    }
                }
            }
        }
        if keyframes.is_empty() {
            tracing::warn!(label = %label.name, frame = track.frame, "Dropping imported track without keyframes");
            return Ok(None);
        }

        let (immutable_defaults, mutable_defaults) = Self::split_attributes(&label, &label.default_attributes());
        let mut attributes = immutable_defaults;
        attributes.extend(Self::attributes_from(&track.attributes));
        if let Some(first) = keyframes.values_mut().next() {
            for (id, value) in mutable_defaults {
                if !attributes.contains_key(&id) {
                    first.attributes.entry(id).or_insert(value);
                }
            }
        }

        let mut annotation = Annotation::new_track(client_id, track.label_id, shape_type, keyframes);
        annotation.server_id = track.id;
        annotation.group = track.group;
        annotation.source = track.source;
        annotation.attributes = attributes;
        annotation.parent = parent;
        annotation.elements = elements;

        self.groups_max = self.groups_max.max(track.group);
        self.store.insert(annotation);
        Ok(Some(client_id))
    }

    fn import_tag(&mut self, tag: &SerializedTag) -> Result<ClientId, FramelabelError> {
        let label = self.label(tag.label_id)?;
        let mut attributes = label.default_attributes();
        attributes.extend(Self::attributes_from(&tag.attributes));

        let client_id = ClientId::fresh();
        let mut annotation = Annotation::new_tag(client_id, tag.label_id, tag.frame);
        annotation.server_id = tag.id;
        annotation.group = tag.group;
        annotation.source = tag.source;
        annotation.attributes = attributes;

        self.groups_max = self.groups_max.max(tag.group);
        self.store.insert(annotation);
        Ok(client_id)
    }

    fn serialize_attributes(values: &BTreeMap<crate::format::AttributeId, String>) -> Vec<SerializedAttribute> {
        values
            .iter()
            .map(|(id, value)| SerializedAttribute::new(*id, value.clone()))
            .collect()
    }

    /// Serializes every live annotation.
    pub fn export(&self) -> SerializedCollection {
        SerializedCollection {
            shapes: self.store.shapes().map(|a| self.export_shape(a)).collect(),
            tracks: self.store.tracks().map(|a| self.export_track(a)).collect(),
            tags: self
                .store
                .tags()
                .map(|a| SerializedTag {
                    id: a.server_id,
                    client_id: Some(a.client_id),
                    frame: a.frame,
                    label_id: a.label_id,
                    group: a.group,
                    source: a.source,
                    attributes: Self::serialize_attributes(&a.attributes),
                })
                .collect(),
        }
    }

    fn export_shape(&self, a: &Annotation) -> SerializedShape {
        let position = a.position().cloned().unwrap_or_default();
        SerializedShape {
            id: a.server_id,
            client_id: Some(a.client_id),
            shape_type: a.shape_type.unwrap_or(ShapeType::Points),
            frame: a.frame,
            label_id: a.label_id,
            group: a.group,
            source: a.source,
            occluded: position.occluded,
            outside: position.outside,
            z_order: position.z_order,
            rotation: position.rotation,
            points: position.points,
            attributes: Self::serialize_attributes(&a.attributes),
            elements: self.store.elements_of(a).map(|e| self.export_shape(e)).collect(),
        }
    }

    fn export_track(&self, a: &Annotation) -> SerializedTrack {
        let shape_type = a.shape_type.unwrap_or(ShapeType::Points);
        let shapes = a
            .keyframes()
            .into_iter()
            .flatten()
            .map(|(frame, shape)| SerializedTrackedShape {
                id: shape.server_id,
                frame: *frame,
                shape_type,
                occluded: shape.position.occluded,
                outside: shape.position.outside,
                z_order: shape.position.z_order,
                rotation: shape.position.rotation,
                points: shape.position.points.clone(),
                attributes: Self::serialize_attributes(&shape.attributes),
            })
            .collect();

        SerializedTrack {
            id: a.server_id,
            client_id: Some(a.client_id),
            frame: a.frame,
            label_id: a.label_id,
            group: a.group,
            source: a.source,
            attributes: Self::serialize_attributes(&a.attributes),
            shapes,
            elements: self.store.elements_of(a).map(|e| self.export_track(e)).collect(),
        }
    }

    /// Projects one object at `frame`.
    pub fn object_state(&self, client_id: ClientId, frame: u32) -> Result<ObjectState, FramelabelError> {
        let annotation = self
            .store
            .get(client_id)
            .ok_or_else(|| FramelabelError::scripting(format!("object {} does not exist", client_id)))?;
        self.build_state(annotation, frame)
    }

    pub(crate) fn build_state(&self, a: &Annotation, frame: u32) -> Result<ObjectState, FramelabelError> {
        let mut state = match a.shape_type {
            Some(shape_type) if a.object_type() == ObjectType::Track => {
                ObjectState::track(shape_type, frame, a.label_id, Vec::new())
            }
            Some(shape_type) => ObjectState::shape(shape_type, a.frame, a.label_id, Vec::new()),
            None => ObjectState::tag(a.frame, a.label_id),
        };
        state.client_id = Some(a.client_id);
        state.server_id = a.server_id;
        state.group = a.group;
        state.source = a.source;
        state.lock = a.lock;
        state.hidden = a.hidden;
        state.pinned = a.pinned;
        state.color = a.color.clone();
        state.descriptions = a.descriptions.clone();
        state.parent_id = a.parent;
        state.updated = a.updated;
        state.attributes = a.attributes_at(frame);

        let position = match &a.kind {
            crate::annotations::AnnotationKind::Shape(position) => {
                state.keyframe = true;
                Some(position.clone())
            }
            crate::annotations::AnnotationKind::Track(keyframes) => {
                let shape_type = a.shape_type.unwrap_or(ShapeType::Points);
                let resolved = position_at(a.client_id, shape_type, keyframes, frame)?;
                state.keyframe = resolved.keyframe;
                state.keyframes = Some(KeyframesInfo::around(keyframes, frame));
                Some(resolved.position)
            }
            crate::annotations::AnnotationKind::Tag => None,
        };
        if let Some(position) = position {
            state.points = position.points;
            state.occluded = position.occluded;
            state.outside = position.outside;
            state.rotation = position.rotation;
            state.z_order = position.z_order;
        }

        if a.is_skeleton() {
            let elements = self
                .store
                .elements_of(a)
                .map(|e| self.build_state(e, frame))
                .collect::<Result<Vec<_>, _>>()?;
            if !elements.is_empty() {
                state.occluded = elements.iter().all(|e| e.occluded);
                state.outside = elements.iter().all(|e| e.outside);
                state.lock = elements.iter().all(|e| e.lock);
                state.hidden = elements.iter().all(|e| e.hidden);
                state.keyframe = elements.iter().any(|e| e.keyframe);
                state.z_order = elements.iter().map(|e| e.z_order).max().unwrap_or(state.z_order);
            }
            state.elements = elements;
        }

        state.changes = ChangeSet::default();
        Ok(state)
    }

    pub(crate) fn filter_record(&self, state: &ObjectState) -> Option<FilterRecord> {
        let client_id = state.client_id?;
        let label = self.schema.label(state.label_id);
        let bbox = match state.shape_type {
            Some(ShapeType::Skeleton) => {
                let points: Vec<f64> = state.elements.iter().flat_map(|e| e.points.iter().copied()).collect();
                Some(BBoxXYXY::wrapping(&points, 0.0))
            }
            Some(shape_type) => Some(BBoxXYXY::of_shape(shape_type, &state.points)),
            None => None,
        };
        let attr = state
            .attributes
            .iter()
            .filter_map(|(id, value)| {
                let spec = label.and_then(|l| l.attribute(*id))?;
                Some((spec.name.clone(), value.clone()))
            })
            .collect();

        Some(FilterRecord {
            client_id,
            server_id: state.server_id,
            label: label.map(|l| l.name.clone()).unwrap_or_default(),
            object_type: state.object_type,
            shape_type: state.shape_type,
            occluded: state.occluded,
            width: bbox.map(|b| b.width()),
            height: bbox.map(|b| b.height()),
            attr,
        })
    }

    /// Runs the configured filter; empty rules keep everything.
    pub(crate) fn apply_filter(&self, states: Vec<ObjectState>, rules: &[serde_json::Value]) -> Vec<ObjectState> {
        if rules.is_empty() {
            return states;
        }
        let records: Vec<FilterRecord> = states.iter().filter_map(|s| self.filter_record(s)).collect();
        let keep: BTreeSet<ClientId> = self.filter.filter(&records, rules).into_iter().collect();
        states
            .into_iter()
            .filter(|s| s.client_id.is_some_and(|id| keep.contains(&id)))
            .collect()
    }

    /// States of every object visible at `frame`.
    ///
    /// Track positions that are interpolated and outside are left out
    /// unless `all_tracks` is set.
    pub fn get(
        &self,
        frame: u32,
        all_tracks: bool,
        rules: &[serde_json::Value],
    ) -> Result<Vec<ObjectState>, FramelabelError> {
        let mut states = Vec::new();
        for shape in self.store.shapes_at(frame) {
            states.push(self.build_state(shape, frame)?);
        }
        for track in self.store.tracks() {
            let state = self.build_state(track, frame)?;
            if !all_tracks && state.outside && !state.keyframe {
                continue;
            }
            states.push(state);
        }
        for tag in self.store.tags_at(frame) {
            states.push(self.build_state(tag, frame)?);
        }
        Ok(self.apply_filter(states, rules))
    }

    /// Undoes up to `count` history steps.
    pub fn undo(&mut self, count: usize) -> Vec<ClientId> {
        self.history.undo(count, &mut self.store)
    }

    /// Redoes up to `count` history steps.
    pub fn redo(&mut self, count: usize) -> Vec<ClientId> {
        self.history.redo(count, &mut self.store)
    }

    /// Display color of a group, picked once and cached.
    pub fn group_color(&mut self, group: u32) -> String {
        if let Some(color) = self.group_colors.get(&group) {
            return color.clone();
        }
        let index = match self.color_seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ u64::from(group)).random_range(0..GROUP_PALETTE.len()),
            None => rand::rng().random_range(0..GROUP_PALETTE.len()),
        };
        let color = GROUP_PALETTE[index].to_string();
        self.group_colors.insert(group, color.clone());
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{SerializedTrackedShape, Source};
    use crate::schema::{FrameSize, LabelType};
    use std::collections::BTreeSet;

    fn task() -> TaskMeta {
        TaskMeta {
            name: "test".into(),
            start_frame: 0,
            stop_frame: 99,
            frame_size: FrameSize {
                width: 200,
                height: 100,
            },
            frame_sizes: BTreeMap::new(),
            deleted_frames: BTreeSet::new(),
            labels: vec![
                Label::new(1u64, "car", LabelType::Any),
                Label::new(2u64, "day", LabelType::Tag),
            ],
        }
    }

    fn rect_track() -> SerializedTrack {
        SerializedTrack::new(
            10,
            1u64,
            vec![
                SerializedTrackedShape::new(ShapeType::Rectangle, 10, vec![0.0, 0.0, 10.0, 10.0]),
                SerializedTrackedShape::new(ShapeType::Rectangle, 20, vec![10.0, 10.0, 30.0, 30.0]),
            ],
        )
    }

    #[test]
    fn test_import_drops_empty_tracks() {
        let mut collection = Collection::from_task(task());
        let data = SerializedCollection {
            tracks: vec![rect_track(), SerializedTrack::new(0, 1u64, vec![])],
            ..Default::default()
        };
        let ids = collection.import(&data).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(collection.export().tracks.len(), 1);
    }

    #[test]
    fn test_import_rejects_unknown_label() {
        let mut collection = Collection::from_task(task());
        let data = SerializedCollection {
            tags: vec![SerializedTag::new(0, 42u64)],
            ..Default::default()
        };
        assert!(matches!(collection.import(&data), Err(FramelabelError::Data(_))));
        assert!(collection.export().is_empty());
    }

    #[test]
    fn test_import_rejects_wrong_point_count() {
        let mut collection = Collection::from_task(task());
        let data = SerializedCollection {
            shapes: vec![
                SerializedShape::new(ShapeType::Points, 0, 1u64, vec![1.0, 1.0]),
                SerializedShape::new(ShapeType::Rectangle, 0, 1u64, vec![1.0, 2.0, 3.0]),
            ],
            ..Default::default()
        };
        assert!(matches!(collection.import(&data), Err(FramelabelError::Data(_))));
        // nothing from the payload is kept
        assert!(collection.export().is_empty());

        let data = SerializedCollection {
            tracks: vec![SerializedTrack::new(
                0,
                1u64,
                vec![SerializedTrackedShape::new(ShapeType::Polygon, 0, vec![0.0, 0.0, 1.0, 1.0])],
            )],
            ..Default::default()
        };
        assert!(matches!(collection.import(&data), Err(FramelabelError::Data(_))));
    }

    #[test]
    fn test_import_crops_masks_to_the_frame() {
        let mut collection = Collection::from_task(task());
        let mask = |points: Vec<f64>| SerializedShape::new(ShapeType::Mask, 0, 1u64, points);
        let data = SerializedCollection {
            shapes: vec![
                mask(vec![0.0, 4.0, 190.0, 90.0, 191.0, 91.0]),
                // only the pixel at (199, 99) is inside the 200x100 frame
                mask(vec![0.0, 4.0, 199.0, 99.0, 200.0, 100.0]),
                mask(vec![0.0, 4.0, 5000.0, 5000.0, 5001.0, 5001.0]),
            ],
            ..Default::default()
        };

        let ids = collection.import(&data).unwrap();
        assert_eq!(ids.len(), 2);
        let points: Vec<Vec<f64>> = collection.export().shapes.into_iter().map(|s| s.points).collect();
        assert_eq!(
            points,
            vec![
                vec![0.0, 4.0, 190.0, 90.0, 191.0, 91.0],
                vec![0.0, 1.0, 199.0, 99.0, 199.0, 99.0],
            ]
        );
    }

    #[test]
    fn test_get_hides_interpolated_outside_tracks() {
        let mut collection = Collection::from_task(task());
        collection
            .import(&SerializedCollection {
                tracks: vec![rect_track()],
                tags: vec![SerializedTag::new(25, 2u64)],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(collection.get(15, false, &[]).unwrap().len(), 1);
        let at_25 = collection.get(25, false, &[]).unwrap();
        assert_eq!(at_25.len(), 1);
        assert_eq!(at_25[0].object_type(), ObjectType::Tag);
        assert_eq!(collection.get(25, true, &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_get_applies_filter() {
        let filter = PredicateFilter(|r: &FilterRecord, _: &[serde_json::Value]| r.label == "day");
        let mut collection = Collection::from_task(task()).with_filter(filter);
        collection
            .import(&SerializedCollection {
                shapes: vec![SerializedShape::new(ShapeType::Rectangle, 3, 1u64, vec![0.0, 0.0, 5.0, 5.0])],
                tags: vec![SerializedTag::new(3, 2u64)],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(collection.get(3, false, &[]).unwrap().len(), 2);
        let filtered = collection.get(3, false, &[serde_json::json!({"any": "rule"})]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].label_id(), LabelId(2));
    }

    #[test]
    fn test_groups_max_follows_import() {
        let mut collection = Collection::from_task(task());
        let mut shape = SerializedShape::new(ShapeType::Points, 0, 1u64, vec![1.0, 1.0]);
        shape.group = 7;
        shape.source = Source::Auto;
        collection
            .import(&SerializedCollection {
                shapes: vec![shape],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(collection.groups_max(), 7);
        assert_eq!(collection.export().shapes[0].source, Source::Auto);
    }

    #[test]
    fn test_group_colors_are_cached() {
        let mut collection = Collection::from_task(task()).with_color_seed(3);
        let first = collection.group_color(5);
        assert!(GROUP_PALETTE.contains(&first.as_str()));
        assert_eq!(collection.group_color(5), first);
    }
}
