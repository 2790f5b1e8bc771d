//! Persisting edited object states back into the collection.

use std::collections::BTreeMap;

use super::store::ObjectStore;
use super::Collection;
use crate::annotations::{check_points, check_shape_area, fit_points, Annotation, AnnotationKind, Position, TrackedShape};
use crate::error::FramelabelError;
use crate::format::{AttributeId, ClientId, ShapeType};
use crate::geometry::normalize_angle;
use crate::history::{HistoryAction, Restore};
use crate::interpolation::position_at;
use crate::schema::Label;
use crate::state::{ChangeSet, ObjectState};

pub(super) fn object_mut(store: &mut ObjectStore, id: ClientId) -> Result<&mut Annotation, FramelabelError> {
    store
        .get_mut(id)
        .ok_or_else(|| FramelabelError::scripting(format!("object {} does not exist", id)))
}

/// Makes sure a track has a keyframe at `frame`, seeding it from the
/// position the track has there.
pub(super) fn ensure_keyframe(annotation: &mut Annotation, frame: u32) -> Result<(), FramelabelError> {
    let client_id = annotation.client_id;
    let shape_type = annotation.shape_type.unwrap_or(ShapeType::Points);
    let Some(keyframes) = annotation.keyframes_mut() else {
        return Err(FramelabelError::scripting(format!("object {} is not a track", client_id)));
    };
    if !keyframes.contains_key(&frame) {
        let position = position_at(client_id, shape_type, keyframes, frame)?.position;
        keyframes.insert(frame, TrackedShape::new(position));
    }
    annotation.sync_track_frame();
    Ok(())
}

/// Applies `edit` to the position of a shape, or of a track at `frame`.
fn edit_position(
    annotation: &mut Annotation,
    frame: u32,
    edit: impl FnOnce(&mut Position),
) -> Result<(), FramelabelError> {
    if annotation.keyframes().is_some() {
        ensure_keyframe(annotation, frame)?;
    }
    let position = match &mut annotation.kind {
        AnnotationKind::Shape(position) => position,
        AnnotationKind::Track(keyframes) => match keyframes.get_mut(&frame) {
            Some(shape) => &mut shape.position,
            None => return Err(FramelabelError::scripting("keyframe vanished while saving")),
        },
        AnnotationKind::Tag => return Err(FramelabelError::argument("tags have no geometry")),
    };
    edit(position);
    annotation.touch();
    Ok(())
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7 && color.starts_with('#') && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Moves attribute values from one label to another by attribute name,
/// keeping only values the new label accepts.
fn remap_attributes(
    from: &Label,
    to: &Label,
    values: &BTreeMap<AttributeId, String>,
) -> BTreeMap<AttributeId, String> {
    values
        .iter()
        .filter_map(|(id, value)| {
            let name = &from.attribute(*id)?.name;
            let spec = to.attribute_by_name(name)?;
            spec.validate(value).then(|| (spec.id, value.clone()))
        })
        .collect()
}

impl Collection {
    /// Writes the changed fields of `state` into the collection.
    ///
    /// Every changed field group becomes its own history entry, except for
    /// skeletons, which are saved atomically as one entry. Saving a locked
    /// object is a no-op unless the save unlocks it. Returns the refreshed
    /// state.
    pub fn save(&mut self, state: &ObjectState) -> Result<ObjectState, FramelabelError> {
        let client_id = state
            .client_id
            .ok_or_else(|| FramelabelError::scripting("only states produced by the collection can be saved"))?;
        let annotation = self
            .store
            .get(client_id)
            .ok_or_else(|| FramelabelError::scripting(format!("object {} does not exist", client_id)))?;
        if annotation.removed {
            return Err(FramelabelError::data(format!("object {} has been removed", client_id)));
        }

        if annotation.is_skeleton() {
            self.save_skeleton(client_id, state)?;
        } else {
            self.save_object(client_id, state)?;
        }
        self.object_state(client_id, state.frame)
    }

    fn save_skeleton(&mut self, client_id: ClientId, state: &ObjectState) -> Result<(), FramelabelError> {
        let was_frozen = self.history.is_frozen();
        self.history.freeze(true);
        let tree = self.store.tree_ids(client_id);
        let before = self.store.snapshot(&tree);

        let mut actions = Vec::new();
        let mut errors = Vec::new();

        let parent_changes = ChangeSet {
            label: state.changes.label,
            attributes: state.changes.attributes.clone(),
            lock: state.changes.lock,
            hidden: state.changes.hidden,
            pinned: state.changes.pinned,
            color: state.changes.color,
            descriptions: state.changes.descriptions,
            ..ChangeSet::default()
        };
        let parent_state = ObjectState {
            changes: parent_changes,
            ..state.clone()
        };
        match self.save_object(client_id, &parent_state) {
            Ok(done) => actions.extend(done),
            Err(err) => errors.push(err),
        }

        for element in &state.elements {
            let mut element = element.clone();
            if state.changes.lock {
                element.set_lock(state.lock);
            }
            if state.changes.hidden {
                element.set_hidden(state.hidden);
            }
            if state.changes.occluded {
                element.set_occluded(state.occluded);
            }
            if state.changes.outside {
                element.set_outside(state.outside);
            }
            if state.changes.keyframe {
                element.set_keyframe(state.keyframe);
            }
            if state.changes.z_order {
                element.set_z_order(state.z_order);
            }

            let result = match element.client_id {
                Some(id) if tree.contains(&id) => self.save_object(id, &element),
                _ => Err(FramelabelError::argument(format!(
                    "element does not belong to skeleton {}",
                    client_id
                ))),
            };
            match result {
                Ok(done) => actions.extend(done),
                Err(err) => errors.push(err),
            }
        }

        if !errors.is_empty() {
            self.store.restore(&before);
            self.history.freeze(was_frozen);
            tracing::debug!(%client_id, errors = errors.len(), "Skeleton save rolled back");
            return Err(FramelabelError::Skeleton { client_id, errors });
        }

        self.store.sync_skeleton_keyframes(client_id);
        self.history.freeze(was_frozen);
        if let Some(action) = actions.first() {
            let after = self.store.snapshot(&tree);
            self.history.record(*action, before, after, tree, state.frame);
        }
        Ok(())
    }

    /// Saves one non-skeleton object. Everything is validated before the
    /// first change is applied.
    pub(super) fn save_object(
        &mut self,
        client_id: ClientId,
        state: &ObjectState,
    ) -> Result<Vec<HistoryAction>, FramelabelError> {
        let changes = &state.changes;
        if changes.is_empty() {
            return Ok(Vec::new());
        }
        let annotation = self.live(client_id)?.clone();
        if annotation.lock && !(changes.lock && !state.lock) {
            tracing::debug!(%client_id, "Ignoring save of a locked object");
            return Ok(Vec::new());
        }

        let frame = state.frame;
        let shape_type = annotation.shape_type;
        let is_track = annotation.keyframes().is_some();
        let old_label = self.label(annotation.label_id)?.clone();

        let new_label = if changes.label && state.label_id != annotation.label_id {
            if annotation.is_skeleton() || annotation.parent.is_some() {
                return Err(FramelabelError::argument("the label of a skeleton or its elements cannot be changed"));
            }
            let label = self.label(state.label_id)?;
            if !label.accepts(shape_type) {
                return Err(FramelabelError::argument(format!(
                    "label '{}' does not accept {}",
                    label.name,
                    shape_type.map(|t| t.as_str()).unwrap_or("tag")
                )));
            }
            Some(label.clone())
        } else {
            None
        };
        let label = new_label.clone().unwrap_or_else(|| old_label.clone());

        let mut attribute_updates = Vec::new();
        for id in &changes.attributes {
            let spec = label.attribute(*id).ok_or_else(|| {
                FramelabelError::argument(format!("attribute {} does not belong to label '{}'", id, label.name))
            })?;
            let value = state
                .attributes
                .get(id)
                .ok_or_else(|| FramelabelError::argument(format!("attribute {} has no value", id)))?;
            if !spec.validate(value) {
                return Err(FramelabelError::argument(format!(
                    "'{}' is not a valid value of attribute '{}'",
                    value, spec.name
                )));
            }
            attribute_updates.push((*id, value.clone(), spec.mutable && is_track));
        }

        let points = if changes.points {
            let shape_type = shape_type.ok_or_else(|| FramelabelError::argument("tags have no points"))?;
            check_points(shape_type, &state.points)?;
            let size = self
                .meta
                .frame_size(frame)
                .ok_or_else(|| FramelabelError::argument(format!("frame {} is outside the task", frame)))?;
            let fitted = fit_points(shape_type, &state.points, state.rotation, size);
            if check_shape_area(shape_type, &fitted) {
                Some(fitted)
            } else {
                tracing::debug!(%client_id, frame, "Ignoring degenerate points");
                None
            }
        } else {
            None
        };

        if changes.rotation && !state.rotation.is_finite() {
            return Err(FramelabelError::argument("rotation must be a finite number"));
        }
        if changes.color {
            if let Some(color) = &state.color {
                if !is_hex_color(color) {
                    return Err(FramelabelError::argument(format!("'{}' is not a #rrggbb color", color)));
                }
            }
        }
        if changes.keyframe && !state.keyframe {
            if let Some(keyframes) = annotation.keyframes() {
                if keyframes.len() == 1 && keyframes.contains_key(&frame) {
                    return Err(FramelabelError::data("the only keyframe of a track cannot be removed"));
                }
            }
        }

        let mut scope = vec![client_id];
        if let Some(parent) = annotation.parent {
            if self.store.get(parent).is_some_and(|p| p.keyframes().is_some()) {
                scope.push(parent);
            }
        }
        let mut actions = Vec::new();

        if let Some(label) = new_label {
            self.commit(HistoryAction::ChangedLabel, &scope, frame, |store| {
                let a = object_mut(store, client_id)?;
                let (immutable_defaults, mutable_defaults) =
                    Collection::split_attributes(&label, &label.default_attributes());
                let mut attributes = if a.keyframes().is_some() {
                    immutable_defaults
                } else {
                    label.default_attributes()
                };
                attributes.extend(remap_attributes(&old_label, &label, &a.attributes));
                a.attributes = attributes;
                if let Some(keyframes) = a.keyframes_mut() {
                    for shape in keyframes.values_mut() {
                        shape.attributes = remap_attributes(&old_label, &label, &shape.attributes);
                    }
                    if let Some(first) = keyframes.values_mut().next() {
                        for (id, value) in mutable_defaults {
                            first.attributes.entry(id).or_insert(value);
                        }
                    }
                }
                a.label_id = label.id;
                a.touch();
                Ok(())
            })?;
            actions.push(HistoryAction::ChangedLabel);
        }

        if !attribute_updates.is_empty() {
            self.commit(HistoryAction::ChangedAttributes, &scope, frame, |store| {
                let a = object_mut(store, client_id)?;
                for (id, value, on_keyframe) in attribute_updates {
                    if on_keyframe {
                        ensure_keyframe(a, frame)?;
                        if let Some(shape) = a.keyframes_mut().and_then(|k| k.get_mut(&frame)) {
                            shape.attributes.insert(id, value);
                        }
                    } else {
                        a.attributes.insert(id, value);
                    }
                }
                a.touch();
                Ok(())
            })?;
            actions.push(HistoryAction::ChangedAttributes);
        }

        let position_edits: [(bool, HistoryAction); 5] = [
            (points.is_some(), HistoryAction::ChangedPoints),
            (changes.rotation, HistoryAction::ChangedRotation),
            (changes.outside, HistoryAction::ChangedOutside),
            (changes.occluded, HistoryAction::ChangedOccluded),
            (changes.z_order, HistoryAction::ChangedZOrder),
        ];
        for (changed, action) in position_edits {
            if !changed {
                continue;
            }
            let points = points.clone();
            self.commit(action, &scope, frame, |store| {
                let a = object_mut(store, client_id)?;
                edit_position(a, frame, |position| match action {
                    HistoryAction::ChangedPoints => {
                        if let Some(points) = points {
                            position.points = points;
                        }
                    }
                    HistoryAction::ChangedRotation => position.rotation = normalize_angle(state.rotation),
                    HistoryAction::ChangedOutside => position.outside = state.outside,
                    HistoryAction::ChangedOccluded => position.occluded = state.occluded,
                    _ => position.z_order = state.z_order,
                })
            })?;
            actions.push(action);
        }

        if changes.keyframe && is_track {
            self.commit(HistoryAction::ChangedKeyframe, &scope, frame, |store| {
                let a = object_mut(store, client_id)?;
                if state.keyframe {
                    ensure_keyframe(a, frame)?;
                } else if let Some(keyframes) = a.keyframes_mut() {
                    keyframes.remove(&frame);
                    a.sync_track_frame();
                }
                a.touch();
                Ok(())
            })?;
            actions.push(HistoryAction::ChangedKeyframe);
        }

        let flag_edits: [(bool, HistoryAction); 5] = [
            (changes.lock, HistoryAction::ChangedLock),
            (changes.pinned, HistoryAction::ChangedPinned),
            (changes.color, HistoryAction::ChangedColor),
            (changes.hidden, HistoryAction::ChangedHidden),
            (changes.descriptions, HistoryAction::ChangedDescriptions),
        ];
        for (changed, action) in flag_edits {
            if !changed {
                continue;
            }
            self.commit(action, &scope, frame, |store| {
                let a = object_mut(store, client_id)?;
                match action {
                    HistoryAction::ChangedLock => a.lock = state.lock,
                    HistoryAction::ChangedPinned => a.pinned = state.pinned,
                    HistoryAction::ChangedColor => a.color = state.color.clone(),
                    HistoryAction::ChangedHidden => a.hidden = state.hidden,
                    _ => a.descriptions = state.descriptions.clone(),
                }
                a.touch();
                Ok(())
            })?;
            actions.push(action);
        }

        Ok(actions)
    }
}
