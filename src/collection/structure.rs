//! Structural edits that replace objects with new ones: merge, split,
//! group, join and slice.

use std::collections::{BTreeMap, BTreeSet};

use super::save::object_mut;
use super::Collection;
use crate::annotations::{
    check_points, check_shape_area, fit_points, Annotation, AnnotationKind, Attributable, Keyframes, Position,
    TrackedShape,
};
use crate::error::FramelabelError;
use crate::format::{AttributeId, ClientId, ObjectType, ShapeType, Source};
use crate::history::HistoryAction;
use crate::interpolation::position_at;
use crate::mask;
use crate::schema::Label;
use crate::state::ObjectState;

/// A keyframe candidate collected from a merge source.
struct MergeCandidate {
    position: Position,
    attributes: BTreeMap<AttributeId, String>,
}

/// Keyframe placeholders of a skeleton parent: one per frame where any
/// element has a keyframe.
fn placeholder_keyframes(elements: &[Annotation], parent: ClientId) -> Keyframes {
    elements
        .iter()
        .filter(|e| e.parent == Some(parent))
        .filter_map(|e| e.keyframes())
        .flat_map(|k| k.keys().copied())
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .map(|frame| (frame, TrackedShape::default()))
        .collect()
}

/// Mutable attribute values of a track at `frame`: everything not stored on
/// the entity itself.
fn keyframe_attributes(track: &Annotation, frame: u32) -> BTreeMap<AttributeId, String> {
    track
        .attributes_at(frame)
        .into_iter()
        .filter(|(id, _)| !track.attributes.contains_key(id))
        .collect()
}

/// Copies the entity fields of `template` into a fresh object with the
/// given kind.
fn derived(template: &Annotation, kind: AnnotationKind, parent: Option<ClientId>) -> Annotation {
    let mut annotation = template.clone();
    annotation.client_id = ClientId::fresh();
    annotation.server_id = None;
    annotation.kind = kind;
    annotation.removed = false;
    annotation.elements = Vec::new();
    annotation.parent = parent;
    annotation.sync_track_frame();
    annotation.touch();
    annotation
}

impl Collection {
    fn live_sources(&self, states: &[ObjectState]) -> Result<Vec<Annotation>, FramelabelError> {
        states
            .iter()
            .map(|state| {
                let id = Self::state_id(state)?;
                self.live(id).cloned()
            })
            .collect()
    }

    /// Merges shapes and tracks of one label and geometry into a single
    /// new track. The sources are removed.
    pub fn merge(&mut self, states: &[ObjectState]) -> Result<ClientId, FramelabelError> {
        let sources = self.live_sources(states)?;
        let Some(first) = sources.first() else {
            return Err(FramelabelError::argument("nothing to merge"));
        };
        for source in &sources {
            if source.object_type() == ObjectType::Tag {
                return Err(FramelabelError::argument("tags cannot be merged"));
            }
            if source.shape_type == Some(ShapeType::Mask) {
                return Err(FramelabelError::argument("masks cannot be merged"));
            }
            if source.parent.is_some() {
                return Err(FramelabelError::argument("skeleton elements cannot be merged on their own"));
            }
            if source.label_id != first.label_id {
                return Err(FramelabelError::argument("merged objects must share a label"));
            }
            if source.shape_type != first.shape_type {
                return Err(FramelabelError::argument("merged objects must share a geometry type"));
            }
        }

        let label = self.label(first.label_id)?.clone();
        let merged = self.merge_sources(&sources, &label, None)?;
        let Some(root) = merged.first() else {
            return Err(FramelabelError::scripting("merge produced no track"));
        };
        let (client_id, frame) = (root.client_id, root.frame);

        let removed: Vec<ClientId> = sources.iter().map(|s| s.client_id).collect();
        self.commit_replacement(HistoryAction::MergedObjects, &removed, merged, frame);
        Ok(client_id)
    }

    fn merge_sources(
        &self,
        sources: &[Annotation],
        label: &Label,
        parent: Option<ClientId>,
    ) -> Result<Vec<Annotation>, FramelabelError> {
        let Some(first) = sources.first() else {
            return Err(FramelabelError::argument(format!("no '{}' objects to merge", label.name)));
        };
        let shape_type = first.shape_type.unwrap_or(ShapeType::Points);
        let client_id = ClientId::fresh();

        let mut built = Vec::new();
        let keyframes = if shape_type == ShapeType::Skeleton {
            for sublabel in &label.sublabels {
                let bucket: Vec<Annotation> = sources
                    .iter()
                    .flat_map(|s| self.store.elements_of(s))
                    .filter(|e| e.label_id == sublabel.id)
                    .cloned()
                    .collect();
                if bucket.is_empty() {
                    return Err(FramelabelError::argument(format!(
                        "no '{}' element to merge in skeleton '{}'",
                        sublabel.name, label.name
                    )));
                }
                built.extend(self.merge_sources(&bucket, sublabel, Some(client_id))?);
            }
            placeholder_keyframes(&built, client_id)
        } else {
            self.merge_keyframes(sources, label)?
        };

        let immutable: BTreeMap<AttributeId, String> = first
            .attributes
            .iter()
            .filter(|(id, _)| label.attribute(**id).is_some_and(|spec| !spec.mutable))
            .map(|(id, v)| (*id, v.clone()))
            .collect();

        let mut track = Annotation::new_track(client_id, label.id, shape_type, keyframes);
        track.attributes = immutable;
        track.source = Source::Manual;
        track.group = first.group;
        track.parent = parent;
        track.elements = built
            .iter()
            .filter(|e| e.parent == Some(client_id))
            .map(|e| e.client_id)
            .collect();
        built.insert(0, track);
        Ok(built)
    }

    fn merge_keyframes(&self, sources: &[Annotation], label: &Label) -> Result<Keyframes, FramelabelError> {
        let mutable: BTreeSet<AttributeId> = label
            .attributes
            .iter()
            .filter(|spec| spec.mutable)
            .map(|spec| spec.id)
            .collect();
        let mutable_of = |values: BTreeMap<AttributeId, String>| -> BTreeMap<AttributeId, String> {
            values.into_iter().filter(|(id, _)| mutable.contains(id)).collect()
        };

        let mut candidates: BTreeMap<u32, MergeCandidate> = BTreeMap::new();
        let mut insert = |frame: u32, candidate: MergeCandidate| -> Result<(), FramelabelError> {
            match candidates.get(&frame) {
                None => {
                    candidates.insert(frame, candidate);
                }
                Some(existing) => match (existing.position.outside, candidate.position.outside) {
                    (false, false) => {
                        return Err(FramelabelError::argument(format!(
                            "two visible keyframes collide at frame {}",
                            frame
                        )));
                    }
                    (true, false) => {
                        candidates.insert(frame, candidate);
                    }
                    _ => {}
                },
            }
            Ok(())
        };

        let mut closing = Vec::new();
        for source in sources {
            match &source.kind {
                AnnotationKind::Shape(position) => {
                    let attributes = mutable_of(source.attributes.clone());
                    insert(
                        source.frame,
                        MergeCandidate {
                            position: position.clone(),
                            attributes: attributes.clone(),
                        },
                    )?;
                    if let Some(next) = source.frame.checked_add(1) {
                        if next <= self.meta.stop_frame() {
                            closing.push((
                                next,
                                MergeCandidate {
                                    position: Position {
                                        outside: true,
                                        ..position.clone()
                                    },
                                    attributes,
                                },
                            ));
                        }
                    }
                }
                AnnotationKind::Track(keyframes) => {
                    for (frame, shape) in keyframes {
                        insert(
                            *frame,
                            MergeCandidate {
                                position: shape.position.clone(),
                                attributes: mutable_of(source.attributes_at(*frame)),
                            },
                        )?;
                    }
                    // frames past the last keyframe are outside
                    if let Some((&last, shape)) = keyframes.last_key_value() {
                        if let Some(next) = last.checked_add(1) {
                            if !shape.position.outside && next <= self.meta.stop_frame() {
                                closing.push((
                                    next,
                                    MergeCandidate {
                                        position: Position {
                                            outside: true,
                                            ..shape.position.clone()
                                        },
                                        attributes: mutable_of(source.attributes_at(last)),
                                    },
                                ));
                            }
                        }
                    }
                }
                AnnotationKind::Tag => {}
            }
        }
        for (frame, candidate) in closing {
            candidates.entry(frame).or_insert(candidate);
        }

        while candidates.len() > 1 && candidates.values().next().is_some_and(|c| c.position.outside) {
            candidates.pop_first();
        }

        let mut carried: BTreeMap<AttributeId, String> = BTreeMap::new();
        let mut keyframes = Keyframes::new();
        for (frame, candidate) in candidates {
            let delta: BTreeMap<AttributeId, String> = candidate
                .attributes
                .into_iter()
                .filter(|(id, value)| carried.get(id) != Some(value))
                .collect();
            carried.extend(delta.iter().map(|(k, v)| (*k, v.clone())));
            keyframes.insert(
                frame,
                TrackedShape {
                    server_id: None,
                    position: candidate.position,
                    attributes: delta,
                },
            );
        }
        Ok(keyframes)
    }

    /// Splits a track in two at `frame`.
    ///
    /// The first track ends with an outside keyframe at `frame`, the second
    /// starts there with the position the original had. Returns `None`
    /// when `frame` is not after the first keyframe.
    pub fn split(&mut self, state: &ObjectState, frame: u32) -> Result<Option<(ClientId, ClientId)>, FramelabelError> {
        let client_id = Self::state_id(state)?;
        let track = self.live(client_id)?.clone();
        if track.keyframes().is_none() {
            return Err(FramelabelError::argument("only tracks can be split"));
        }
        if track.parent.is_some() {
            return Err(FramelabelError::argument("skeleton elements cannot be split on their own"));
        }
        if frame <= track.frame {
            return Ok(None);
        }

        let mut created = Vec::new();
        let (before, after) = self.split_track(&track, frame, None, &mut created)?;
        self.commit_replacement(HistoryAction::SplittedTrack, &[client_id], created, frame);
        Ok(Some((before, after)))
    }

    fn split_track(
        &self,
        track: &Annotation,
        frame: u32,
        parents: Option<(ClientId, ClientId)>,
        created: &mut Vec<Annotation>,
    ) -> Result<(ClientId, ClientId), FramelabelError> {
        let (before_parent, after_parent) = match parents {
            Some((b, a)) => (Some(b), Some(a)),
            None => (None, None),
        };

        let (mut before, mut after) = if track.is_skeleton() {
            let mut before = derived(track, AnnotationKind::Track(Keyframes::new()), before_parent);
            let mut after = derived(track, AnnotationKind::Track(Keyframes::new()), after_parent);
            let mut elements = Vec::new();
            for element in self.store.elements_of(track) {
                let (b, a) = self.split_track(element, frame, Some((before.client_id, after.client_id)), &mut elements)?;
                before.elements.push(b);
                after.elements.push(a);
            }
            before.kind = AnnotationKind::Track(placeholder_keyframes(&elements, before.client_id));
            after.kind = AnnotationKind::Track(placeholder_keyframes(&elements, after.client_id));
            created.extend(elements);
            (before, after)
        } else {
            let keyframes = track
                .keyframes()
                .ok_or_else(|| FramelabelError::argument("only tracks can be split"))?;
            let shape_type = track.shape_type.unwrap_or(ShapeType::Points);
            let at = position_at(track.client_id, shape_type, keyframes, frame)?.position;

            let mut head: Keyframes = keyframes.range(..frame).map(|(f, s)| (*f, s.clone())).collect();
            head.insert(
                frame,
                TrackedShape::new(Position {
                    outside: true,
                    ..at.clone()
                }),
            );

            let mut tail: Keyframes = keyframes
                .range(frame.saturating_add(1)..)
                .map(|(f, s)| (*f, s.clone()))
                .collect();
            tail.insert(
                frame,
                TrackedShape {
                    server_id: None,
                    position: at,
                    attributes: keyframe_attributes(track, frame),
                },
            );

            (
                derived(track, AnnotationKind::Track(head), before_parent),
                derived(track, AnnotationKind::Track(tail), after_parent),
            )
        };
        before.sync_track_frame();
        after.sync_track_frame();

        let ids = (before.client_id, after.client_id);
        created.insert(0, after);
        created.insert(0, before);
        Ok(ids)
    }

    /// Puts objects into a fresh group, or ungroups them with `reset`.
    /// Returns the group id assigned.
    pub fn group(&mut self, states: &[ObjectState], reset: bool) -> Result<u32, FramelabelError> {
        if states.is_empty() {
            return Err(FramelabelError::argument("nothing to group"));
        }
        let ids: Vec<ClientId> = self.live_sources(states)?.iter().map(|a| a.client_id).collect();

        let group = if reset {
            0
        } else {
            self.groups_max += 1;
            self.groups_max
        };
        let frame = states[0].frame;
        self.commit(HistoryAction::GroupedObjects, &ids, frame, |store| {
            for id in &ids {
                let annotation = object_mut(store, *id)?;
                annotation.group = group;
                annotation.touch();
            }
            Ok(())
        })?;
        Ok(group)
    }

    /// Replaces two or more masks of one frame with a single mask built
    /// from `points`.
    pub fn join(&mut self, states: &[ObjectState], points: &[f64]) -> Result<ClientId, FramelabelError> {
        if states.len() < 2 {
            return Err(FramelabelError::argument("at least two masks are needed to join"));
        }
        let sources = self.live_sources(states)?;
        let frame = sources[0].frame;
        for source in &sources {
            if source.object_type() != ObjectType::Shape || source.shape_type != Some(ShapeType::Mask) {
                return Err(FramelabelError::argument("only mask shapes can be joined"));
            }
            if source.frame != frame {
                return Err(FramelabelError::argument("joined masks must be on the same frame"));
            }
        }

        let size = self
            .meta
            .frame_size(frame)
            .ok_or_else(|| FramelabelError::argument(format!("frame {} is outside the task", frame)))?;
        check_points(ShapeType::Mask, points)?;
        let cropped = mask::crop_mask(points, size.width, size.height);
        if mask::is_void(&cropped) {
            return Err(FramelabelError::argument("the joined mask has no pixels"));
        }

        let first = &sources[0];
        let position = Position {
            points: cropped,
            occluded: sources.iter().any(|s| s.position().is_some_and(|p| p.occluded)),
            outside: false,
            rotation: 0.0,
            z_order: sources
                .iter()
                .filter_map(|s| s.position().map(|p| p.z_order))
                .max()
                .unwrap_or_default(),
        };
        let joined = derived(first, AnnotationKind::Shape(position), None);
        let client_id = joined.client_id;

        let removed: Vec<ClientId> = sources.iter().map(|s| s.client_id).collect();
        self.commit_replacement(HistoryAction::JoinedObjects, &removed, vec![joined], frame);
        Ok(client_id)
    }

    /// Cuts a polygon or mask shape into the two given pieces.
    ///
    /// Mask pieces are run lengths over the original box.
    pub fn slice(&mut self, state: &ObjectState, results: &[Vec<f64>]) -> Result<(ClientId, ClientId), FramelabelError> {
        let [first, second] = results else {
            return Err(FramelabelError::argument("slicing must produce exactly two shapes"));
        };
        let client_id = Self::state_id(state)?;
        let source = self.live(client_id)?.clone();
        let Some(position) = source.position().cloned() else {
            return Err(FramelabelError::argument("only shapes can be sliced"));
        };
        if source.parent.is_some() {
            return Err(FramelabelError::argument("skeleton elements cannot be sliced"));
        }
        let shape_type = match source.shape_type {
            Some(t @ (ShapeType::Polygon | ShapeType::Mask)) => t,
            _ => return Err(FramelabelError::argument("only polygons and masks can be sliced")),
        };

        let size = self
            .meta
            .frame_size(source.frame)
            .ok_or_else(|| FramelabelError::argument(format!("frame {} is outside the task", source.frame)))?;

        let mut pieces = Vec::with_capacity(2);
        for result in [first, second] {
            let points = if shape_type == ShapeType::Mask {
                let original_box = &position.points[position.points.len().saturating_sub(4)..];
                let mut points = result.clone();
                points.extend_from_slice(original_box);
                check_points(ShapeType::Mask, &points)?;
                mask::crop_mask(&points, size.width, size.height)
            } else {
                check_points(ShapeType::Polygon, result)?;
                fit_points(ShapeType::Polygon, result, position.rotation, size)
            };
            if !check_shape_area(shape_type, &points) {
                return Err(FramelabelError::argument("a sliced piece is too small"));
            }
            pieces.push(derived(
                &source,
                AnnotationKind::Shape(Position {
                    points,
                    ..position.clone()
                }),
                None,
            ));
        }

        let ids = (pieces[0].client_id, pieces[1].client_id);
        self.commit_replacement(HistoryAction::SlicedObject, &[client_id], pieces, source.frame);
        Ok(ids)
    }
}
