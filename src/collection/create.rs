//! Creating and removing objects.

use std::collections::BTreeSet;

use super::save::object_mut;
use super::Collection;
use crate::annotations::{check_points, check_shape_area, fit_points, Annotation, Keyframes, Position, TrackedShape};
use crate::error::FramelabelError;
use crate::format::{ClientId, ObjectType, ShapeType};
use crate::geometry::normalize_angle;
use crate::history::HistoryAction;
use crate::mask;
use crate::schema::Label;
use crate::state::ObjectState;

/// Options of [`Collection::put`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// New masks erase their pixels from the visible masks below them.
    pub remove_underlying_pixels: bool,
}

impl Collection {
    /// Creates new objects from states that do not belong to the
    /// collection yet. All states are validated before anything is
    /// inserted. Returns the client ids of the new top-level objects.
    pub fn put(&mut self, states: &[ObjectState], options: PutOptions) -> Result<Vec<ClientId>, FramelabelError> {
        let mut created = Vec::new();
        let mut roots = Vec::with_capacity(states.len());
        for state in states {
            let built = self.build_new(state, state.object_type, None, None)?;
            if let Some(root) = built.first() {
                roots.push(root.client_id);
            }
            created.extend(built);
        }
        if created.is_empty() {
            return Ok(roots);
        }

        let frame = states.first().map(|s| s.frame).unwrap_or_default();
        self.groups_max = self.groups_max.max(created.iter().map(|a| a.group).max().unwrap_or_default());
        let cutters: Vec<(ClientId, u32, i32, Vec<f64>)> = created
            .iter()
            .filter(|a| a.parent.is_none() && a.shape_type == Some(ShapeType::Mask))
            .filter_map(|a| {
                let position = a.position()?;
                Some((a.client_id, a.frame, position.z_order, position.points.clone()))
            })
            .collect();
        self.commit_replacement(HistoryAction::CreatedObjects, &[], created, frame);

        if options.remove_underlying_pixels && !cutters.is_empty() {
            self.remove_underlying_pixels(&cutters)?;
        }
        Ok(roots)
    }

    fn build_new(
        &self,
        state: &ObjectState,
        object_type: ObjectType,
        parent: Option<(ClientId, &Label)>,
        track_frame: Option<u32>,
    ) -> Result<Vec<Annotation>, FramelabelError> {
        if state.client_id.is_some() {
            return Err(FramelabelError::argument("the object already belongs to a collection"));
        }
        let label = self.label(state.label_id)?.clone();
        let shape_type = match object_type {
            ObjectType::Tag => None,
            _ => Some(
                state
                    .shape_type
                    .ok_or_else(|| FramelabelError::argument("shapes and tracks need a geometry type"))?,
            ),
        };
        if !label.accepts(shape_type) {
            return Err(FramelabelError::argument(format!(
                "label '{}' does not accept {}",
                label.name,
                shape_type.map(|t| t.as_str()).unwrap_or("tag")
            )));
        }
        if let Some((_, parent_label)) = parent {
            if !parent_label.sublabels.iter().any(|s| s.id == label.id) {
                return Err(FramelabelError::argument(format!(
                    "'{}' is not a sublabel of '{}'",
                    label.name, parent_label.name
                )));
            }
        }

        let frame = track_frame.unwrap_or(state.frame);
        let size = self
            .meta
            .frame_size(frame)
            .ok_or_else(|| FramelabelError::argument(format!("frame {} is outside the task", frame)))?;

        for (id, value) in &state.attributes {
            let spec = label.attribute(*id).ok_or_else(|| {
                FramelabelError::argument(format!("attribute {} does not belong to label '{}'", id, label.name))
            })?;
            if !spec.validate(value) {
                return Err(FramelabelError::argument(format!(
                    "'{}' is not a valid value of attribute '{}'",
                    value, spec.name
                )));
            }
        }
        let mut attributes = label.default_attributes();
        attributes.extend(state.attributes.iter().map(|(k, v)| (*k, v.clone())));

        let points = match shape_type {
            Some(ShapeType::Skeleton) | None => Vec::new(),
            Some(shape_type) => {
                check_points(shape_type, &state.points)?;
                let fitted = fit_points(shape_type, &state.points, state.rotation, size);
                if !check_shape_area(shape_type, &fitted) {
                    return Err(FramelabelError::data(format!(
                        "{} on frame {} is too small to be created",
                        shape_type, frame
                    )));
                }
                fitted
            }
        };
        let position = Position {
            points,
            occluded: state.occluded,
            outside: state.outside,
            rotation: normalize_angle(state.rotation),
            z_order: state.z_order,
        };

        let client_id = ClientId::fresh();
        let mut annotation = match (object_type, shape_type) {
            (ObjectType::Tag, _) | (_, None) => Annotation::new_tag(client_id, label.id, frame),
            (ObjectType::Shape, Some(shape_type)) => {
                Annotation::new_shape(client_id, label.id, frame, shape_type, position)
            }
            (ObjectType::Track, Some(shape_type)) => {
                let (immutable, mutable) = Collection::split_attributes(&label, &attributes);
                attributes = immutable;
                let mut keyframe = TrackedShape::new(position);
                keyframe.attributes = mutable;
                Annotation::new_track(client_id, label.id, shape_type, Keyframes::from([(frame, keyframe)]))
            }
        };
        annotation.attributes = attributes;
        annotation.group = state.group;
        annotation.source = state.source;
        annotation.lock = state.lock;
        annotation.hidden = state.hidden;
        annotation.pinned = state.pinned;
        annotation.color = state.color.clone();
        annotation.descriptions = state.descriptions.clone();
        annotation.parent = parent.map(|(id, _)| id);

        let mut built = Vec::new();
        if shape_type == Some(ShapeType::Skeleton) {
            let requested: Vec<_> = state.elements.iter().map(|e| e.label_id).collect();
            let distinct: BTreeSet<_> = requested.iter().copied().collect();
            let expected: BTreeSet<_> = label.sublabels.iter().map(|s| s.id).collect();
            if requested.len() != distinct.len() || distinct != expected {
                return Err(FramelabelError::argument(format!(
                    "skeleton '{}' needs exactly one element per sublabel",
                    label.name
                )));
            }
            for element in &state.elements {
                built.extend(self.build_new(element, object_type, Some((client_id, &label)), Some(frame))?);
            }
            annotation.elements = built
                .iter()
                .filter(|a| a.parent == Some(client_id))
                .map(|a| a.client_id)
                .collect();
        }
        built.insert(0, annotation);
        Ok(built)
    }

    /// Erases the pixels of each new mask from the visible masks under it
    /// on the same frame. Masks left without pixels are removed.
    fn remove_underlying_pixels(&mut self, cutters: &[(ClientId, u32, i32, Vec<f64>)]) -> Result<(), FramelabelError> {
        let new_ids: BTreeSet<ClientId> = cutters.iter().map(|(id, ..)| *id).collect();
        let mut targets = BTreeSet::new();
        for (_, frame, z_order, _) in cutters {
            targets.extend(
                self.store
                    .shapes_at(*frame)
                    .filter(|a| a.shape_type == Some(ShapeType::Mask) && !a.hidden && !new_ids.contains(&a.client_id))
                    .filter(|a| a.position().is_some_and(|p| !p.outside && p.z_order <= *z_order))
                    .map(|a| a.client_id),
            );
        }
        if targets.is_empty() {
            return Ok(());
        }

        let sizes: Vec<_> = cutters
            .iter()
            .map(|(_, frame, _, _)| self.meta.frame_size(*frame))
            .collect();
        let targets: Vec<ClientId> = targets.into_iter().collect();
        let frame = cutters.first().map(|(_, f, _, _)| *f).unwrap_or_default();
        self.commit(HistoryAction::RemovedUnderlyingPixels, &targets, frame, |store| {
            for id in &targets {
                let annotation = object_mut(store, *id)?;
                let anchor = annotation.frame;
                let Some(position) = annotation.position_mut() else {
                    continue;
                };
                for ((_, cut_frame, z_order, cutter), size) in cutters.iter().zip(&sizes) {
                    let Some(size) = size else {
                        continue;
                    };
                    if *cut_frame == anchor && position.z_order <= *z_order {
                        position.points = mask::subtract_mask(&position.points, cutter, size.width, size.height);
                    }
                }
                if mask::is_void(&position.points) {
                    annotation.removed = true;
                }
                annotation.touch();
            }
            Ok(())
        })
    }

    /// Soft-deletes an object together with its elements.
    ///
    /// Returns `false` without touching anything when the object is locked
    /// and `force` is not set.
    pub fn remove(&mut self, state: &ObjectState, force: bool) -> Result<bool, FramelabelError> {
        let client_id = Self::state_id(state)?;
        let annotation = self.live(client_id)?;
        if annotation.parent.is_some() {
            return Err(FramelabelError::argument("skeleton elements cannot be removed on their own"));
        }
        if annotation.lock && !force {
            return Ok(false);
        }

        let frame = state.frame;
        let tree = self.store.tree_ids(client_id);
        self.commit(HistoryAction::RemovedObject, &tree, frame, |store| {
            store.remove_tree(client_id);
            Ok(())
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::AttributeId;
    use crate::schema::{AttributeSpec, FrameSize, InputType, LabelType, TaskMeta};
    use std::collections::BTreeMap;

    fn task() -> TaskMeta {
        TaskMeta {
            name: "create".into(),
            start_frame: 0,
            stop_frame: 20,
            frame_size: FrameSize {
                width: 10,
                height: 10,
            },
            frame_sizes: BTreeMap::new(),
            deleted_frames: BTreeSet::new(),
            labels: vec![
                Label::new(1u64, "car", LabelType::Any)
                    .with_attribute(AttributeSpec {
                        id: AttributeId(1),
                        name: "model".into(),
                        input_type: InputType::Text,
                        mutable: false,
                        values: vec![],
                        default_value: Some("unknown".into()),
                    })
                    .with_attribute(AttributeSpec {
                        id: AttributeId(2),
                        name: "moving".into(),
                        input_type: InputType::Checkbox,
                        mutable: true,
                        values: vec!["false".into()],
                        default_value: None,
                    }),
                Label::new(2u64, "box", LabelType::Rectangle),
                Label::new(3u64, "hand", LabelType::Skeleton)
                    .with_sublabel(Label::new(31u64, "wrist", LabelType::Points))
                    .with_sublabel(Label::new(32u64, "thumb", LabelType::Points)),
            ],
        }
    }

    fn full_mask() -> Vec<f64> {
        // 4x4 block at (2, 2)
        vec![0.0, 16.0, 2.0, 2.0, 5.0, 5.0]
    }

    #[test]
    fn test_put_creates_one_history_step() {
        let mut collection = Collection::from_task(task());
        let ids = collection
            .put(
                &[
                    ObjectState::shape(ShapeType::Rectangle, 0, 1u64, vec![0.0, 0.0, 5.0, 5.0]),
                    ObjectState::tag(0, 1u64),
                ],
                PutOptions::default(),
            )
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(collection.get(0, false, &[]).unwrap().len(), 2);
        assert_eq!(collection.history().undo_len(), 1);

        collection.undo(1);
        assert!(collection.get(0, false, &[]).unwrap().is_empty());
        collection.redo(1);
        assert_eq!(collection.get(0, false, &[]).unwrap().len(), 2);
    }

    #[test]
    fn test_put_splits_track_attributes() {
        let mut collection = Collection::from_task(task());
        let ids = collection
            .put(
                &[ObjectState::track(ShapeType::Rectangle, 4, 1u64, vec![0.0, 0.0, 5.0, 5.0]).with_attribute(2u64, "true")],
                PutOptions::default(),
            )
            .unwrap();
        let track = collection.annotation(ids[0]).unwrap();
        assert_eq!(track.attributes.get(&AttributeId(1)).map(String::as_str), Some("unknown"));
        assert!(!track.attributes.contains_key(&AttributeId(2)));
        assert_eq!(track.keyframes().unwrap()[&4].attributes[&AttributeId(2)], "true");
    }

    #[test]
    fn test_put_rejects_wrong_label_type_and_small_shapes() {
        let mut collection = Collection::from_task(task());
        let polygon = ObjectState::shape(ShapeType::Polygon, 0, 2u64, vec![0.0, 0.0, 5.0, 0.0, 5.0, 5.0]);
        assert!(matches!(
            collection.put(&[polygon], PutOptions::default()),
            Err(FramelabelError::Argument(_))
        ));

        let tiny = ObjectState::shape(ShapeType::Rectangle, 0, 2u64, vec![0.0, 0.0, 1.0, 1.0]);
        assert!(matches!(collection.put(&[tiny], PutOptions::default()), Err(FramelabelError::Data(_))));
        assert_eq!(collection.history().undo_len(), 0);
    }

    #[test]
    fn test_put_skeleton_requires_every_sublabel() {
        let mut collection = Collection::from_task(task());
        let partial = ObjectState::shape(ShapeType::Skeleton, 0, 3u64, vec![])
            .with_elements(vec![ObjectState::shape(ShapeType::Points, 0, 31u64, vec![1.0, 1.0])]);
        assert!(collection.put(&[partial], PutOptions::default()).is_err());

        let full = ObjectState::shape(ShapeType::Skeleton, 0, 3u64, vec![]).with_elements(vec![
            ObjectState::shape(ShapeType::Points, 0, 31u64, vec![1.0, 1.0]),
            ObjectState::shape(ShapeType::Points, 0, 32u64, vec![2.0, 2.0]),
        ]);
        let ids = collection.put(&[full], PutOptions::default()).unwrap();
        let state = collection.object_state(ids[0], 0).unwrap();
        assert_eq!(state.elements().len(), 2);
        assert_eq!(state.elements()[0].parent_id(), Some(ids[0]));
    }

    #[test]
    fn test_underlying_pixels_are_removed() {
        let mut collection = Collection::from_task(task());
        let below = ObjectState::shape(ShapeType::Mask, 0, 1u64, full_mask());
        let ids = collection.put(&[below], PutOptions::default()).unwrap();

        let above = ObjectState::shape(ShapeType::Mask, 0, 1u64, full_mask());
        collection
            .put(
                &[above],
                PutOptions {
                    remove_underlying_pixels: true,
                },
            )
            .unwrap();
        assert!(collection.annotation(ids[0]).unwrap().removed);
        assert_eq!(
            collection.history().last().map(|e| e.action),
            Some(HistoryAction::RemovedUnderlyingPixels)
        );

        collection.undo(1);
        assert!(!collection.annotation(ids[0]).unwrap().removed);
    }

    #[test]
    fn test_remove_respects_lock() {
        let mut collection = Collection::from_task(task());
        let ids = collection
            .put(
                &[ObjectState::shape(ShapeType::Rectangle, 0, 1u64, vec![0.0, 0.0, 5.0, 5.0])],
                PutOptions::default(),
            )
            .unwrap();
        let mut state = collection.object_state(ids[0], 0).unwrap();
        state.set_lock(true);
        let state = collection.save(&state).unwrap();

        assert!(!collection.remove(&state, false).unwrap());
        assert!(collection.remove(&state, true).unwrap());
        assert!(collection.get(0, false, &[]).unwrap().is_empty());
        collection.undo(1);
        assert_eq!(collection.get(0, false, &[]).unwrap().len(), 1);
    }
}
