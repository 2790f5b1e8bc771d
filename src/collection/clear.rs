//! Clearing frame ranges or the whole collection.

use std::collections::BTreeSet;

use super::save::object_mut;
use super::Collection;
use crate::error::FramelabelError;
use crate::format::ClientId;
use crate::history::HistoryAction;

impl Collection {
    /// Clears annotations.
    ///
    /// Without bounds the store and the history are wiped; this cannot be
    /// undone and marks the collection as flushed. With `start..=end`,
    /// shapes and tags anchored in the range are removed together with
    /// either the track keyframes in the range (`keyframes_only`) or the
    /// tracks starting in the range. A range clear is one history step.
    pub fn clear(&mut self, start: Option<u32>, end: Option<u32>, keyframes_only: bool) -> Result<(), FramelabelError> {
        let (start, end) = match (start, end) {
            (None, None) => {
                self.store.clear();
                self.history.clear();
                self.groups_max = 0;
                self.group_colors.clear();
                self.flushed = true;
                tracing::debug!("Collection flushed");
                return Ok(());
            }
            (Some(start), Some(end)) if start <= end => (start, end),
            (Some(start), Some(end)) => {
                return Err(FramelabelError::argument(format!(
                    "clear range starts after it ends ({} > {})",
                    start, end
                )));
            }
            _ => return Err(FramelabelError::argument("clear needs both range bounds or none")),
        };
        let range = start..=end;

        let anchored: Vec<ClientId> = self
            .store
            .shapes()
            .chain(self.store.tags())
            .filter(|a| range.contains(&a.frame))
            .map(|a| a.client_id)
            .collect();

        let tracks: Vec<Vec<ClientId>> = self
            .store
            .tracks()
            .filter(|track| {
                let tree = self.store.tree_ids(track.client_id);
                if keyframes_only {
                    tree.iter()
                        .filter_map(|id| self.store.get(*id))
                        .filter_map(|a| a.keyframes())
                        .any(|k| k.range(range.clone()).next().is_some())
                } else {
                    range.contains(&track.frame)
                }
            })
            .map(|track| self.store.tree_ids(track.client_id))
            .collect();

        let ids: Vec<ClientId> = anchored
            .iter()
            .flat_map(|id| self.store.tree_ids(*id))
            .chain(tracks.iter().flatten().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        self.commit(HistoryAction::ClearedFrames, &ids, start, |store| {
            for id in &anchored {
                store.remove_tree(*id);
            }
            for tree in &tracks {
                let Some(root) = tree.first().copied() else {
                    continue;
                };
                if !keyframes_only {
                    store.remove_tree(root);
                    continue;
                }

                let original = store.snapshot(tree);
                let mut emptied = false;
                for id in tree {
                    let annotation = object_mut(store, *id)?;
                    if annotation.is_skeleton() {
                        continue;
                    }
                    if let Some(keyframes) = annotation.keyframes_mut() {
                        keyframes.retain(|frame, _| !range.contains(frame));
                        emptied |= keyframes.is_empty();
                    }
                    annotation.sync_track_frame();
                    annotation.touch();
                }
                if emptied {
                    // a track without keyframes cannot exist; drop it whole
                    for snapshot in original {
                        store.insert(snapshot);
                    }
                    store.remove_tree(root);
                }
            }
            Ok(())
        })?;
        tracing::debug!(start, end, keyframes_only, objects = ids.len(), "Frames cleared");
        Ok(())
    }
}
