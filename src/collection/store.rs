//! Frame-indexed storage of annotations.

use std::collections::{BTreeMap, BTreeSet};

use crate::annotations::{Annotation, TrackedShape};
use crate::format::{ClientId, ObjectType};
use crate::history::Restore;

/// Owns every annotation of a collection, including removed ones.
///
/// Shapes and tags are indexed by frame, tracks are kept in insertion
/// order. Skeleton elements are stored but never indexed; they are reached
/// through their parent.
#[derive(Clone, Debug, Default)]
pub(crate) struct ObjectStore {
    objects: BTreeMap<ClientId, Annotation>,
    shapes: BTreeMap<u32, Vec<ClientId>>,
    tags: BTreeMap<u32, Vec<ClientId>>,
    tracks: Vec<ClientId>,
}

impl ObjectStore {
    pub fn get(&self, id: ClientId) -> Option<&Annotation> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Annotation> {
        self.objects.get_mut(&id)
    }

    /// Inserts or replaces an annotation, keeping the indexes in sync.
    pub fn insert(&mut self, annotation: Annotation) {
        let id = annotation.client_id;
        if let Some(previous) = self.objects.get_mut(&id) {
            // same slot: keep the position in the frame index
            if previous.frame == annotation.frame
                && previous.parent == annotation.parent
                && previous.object_type() == annotation.object_type()
            {
                *previous = annotation;
                return;
            }
        }
        if let Some(previous) = self.objects.remove(&id) {
            self.unindex(&previous);
        }
        if annotation.parent.is_none() {
            match annotation.object_type() {
                ObjectType::Shape => {
                    self.shapes.entry(annotation.frame).or_default().push(id);
                }
                ObjectType::Tag => {
                    self.tags.entry(annotation.frame).or_default().push(id);
                }
                ObjectType::Track => {
                    if !self.tracks.contains(&id) {
                        self.tracks.push(id);
                    }
                }
            }
        }
        self.objects.insert(id, annotation);
    }

    fn unindex(&mut self, annotation: &Annotation) {
        let id = annotation.client_id;
        let index = match annotation.object_type() {
            ObjectType::Shape => &mut self.shapes,
            ObjectType::Tag => &mut self.tags,
            // tracks keep their slot so undo preserves ordering
            ObjectType::Track => return,
        };
        if let Some(ids) = index.get_mut(&annotation.frame) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                index.remove(&annotation.frame);
            }
        }
    }

    /// Live top-level shapes anchored at `frame`.
    pub fn shapes_at(&self, frame: u32) -> impl Iterator<Item = &Annotation> {
        self.live(self.shapes.get(&frame).into_iter().flatten())
    }

    /// Live tags anchored at `frame`.
    pub fn tags_at(&self, frame: u32) -> impl Iterator<Item = &Annotation> {
        self.live(self.tags.get(&frame).into_iter().flatten())
    }

    /// Live top-level tracks in insertion order.
    pub fn tracks(&self) -> impl Iterator<Item = &Annotation> {
        self.live(self.tracks.iter())
    }

    /// Live top-level shapes ordered by frame.
    pub fn shapes(&self) -> impl Iterator<Item = &Annotation> {
        self.live(self.shapes.values().flatten())
    }

    /// Live tags ordered by frame.
    pub fn tags(&self) -> impl Iterator<Item = &Annotation> {
        self.live(self.tags.values().flatten())
    }

    fn live<'a>(&'a self, ids: impl Iterator<Item = &'a ClientId> + 'a) -> impl Iterator<Item = &'a Annotation> + 'a {
        ids.filter_map(|id| self.objects.get(id)).filter(|a| !a.removed)
    }

    /// Frames holding at least one live shape or tag.
    pub fn anchored_frames(&self) -> BTreeSet<u32> {
        self.shapes()
            .chain(self.tags())
            .map(|a| a.frame)
            .collect()
    }

    /// Live element annotations of a skeleton.
    pub fn elements_of<'a>(&'a self, parent: &'a Annotation) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.live(parent.elements.iter())
    }

    /// The id of an object followed by the ids of all its descendants.
    pub fn tree_ids(&self, id: ClientId) -> Vec<ClientId> {
        let mut ids = vec![id];
        let mut cursor = 0;
        while cursor < ids.len() {
            if let Some(a) = self.objects.get(&ids[cursor]) {
                ids.extend(a.elements.iter().copied());
            }
            cursor += 1;
        }
        ids
    }

    /// Clones of the given objects; unknown ids are skipped.
    pub fn snapshot(&self, ids: &[ClientId]) -> Vec<Annotation> {
        ids.iter().filter_map(|id| self.objects.get(id)).cloned().collect()
    }

    /// Marks an object and all its descendants removed.
    pub fn remove_tree(&mut self, id: ClientId) {
        for member in self.tree_ids(id) {
            if let Some(a) = self.objects.get_mut(&member) {
                a.removed = true;
                a.touch();
            }
        }
    }

    /// Rebuilds the placeholder keyframes of a skeleton track from the
    /// keyframes of its live elements.
    pub fn sync_skeleton_keyframes(&mut self, parent_id: ClientId) {
        let Some(parent) = self.objects.get(&parent_id) else {
            return;
        };
        if !parent.is_skeleton() || parent.keyframes().is_none() {
            return;
        }

        let frames: BTreeSet<u32> = self
            .elements_of(parent)
            .filter_map(|e| e.keyframes())
            .flat_map(|k| k.keys().copied())
            .collect();
        if frames.is_empty() {
            return;
        }

        if let Some(parent) = self.objects.get_mut(&parent_id) {
            if let Some(keyframes) = parent.keyframes_mut() {
                keyframes.retain(|f, _| frames.contains(f));
                for frame in frames {
                    keyframes.entry(frame).or_insert_with(TrackedShape::default);
                }
            }
            parent.sync_track_frame();
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

impl Restore for ObjectStore {
    fn restore(&mut self, snapshots: &[Annotation]) {
        for snapshot in snapshots {
            self.insert(snapshot.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Position;
    use crate::format::{LabelId, ShapeType};

    fn shape(id: u64, frame: u32) -> Annotation {
        Annotation::new_shape(ClientId(id), LabelId(1), frame, ShapeType::Points, Position::default())
    }

    #[test]
    fn test_index_by_frame() {
        let mut store = ObjectStore::default();
        store.insert(shape(1, 3));
        store.insert(shape(2, 3));
        store.insert(shape(3, 4));
        assert_eq!(store.shapes_at(3).count(), 2);
        assert_eq!(store.anchored_frames(), BTreeSet::from([3, 4]));
    }

    #[test]
    fn test_removed_objects_are_hidden_but_kept() {
        let mut store = ObjectStore::default();
        store.insert(shape(1, 0));
        store.remove_tree(ClientId(1));
        assert_eq!(store.shapes_at(0).count(), 0);
        assert!(store.get(ClientId(1)).unwrap().removed);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reinsert_does_not_duplicate() {
        let mut store = ObjectStore::default();
        store.insert(shape(1, 0));
        store.restore(&[shape(1, 0)]);
        assert_eq!(store.shapes_at(0).count(), 1);
    }

    #[test]
    fn test_tree_ids_include_elements() {
        let mut store = ObjectStore::default();
        let mut parent = shape(1, 0);
        parent.elements = vec![ClientId(2), ClientId(3)];
        let mut child = shape(2, 0);
        child.parent = Some(ClientId(1));
        store.insert(parent);
        store.insert(child);
        assert_eq!(store.tree_ids(ClientId(1)), vec![ClientId(1), ClientId(2), ClientId(3)]);
        // elements are not indexed by frame
        assert_eq!(store.shapes_at(0).count(), 1);
    }
}
