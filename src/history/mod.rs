//! Bounded undo/redo log.
//!
//! Every entry holds snapshots of the affected annotations before and after
//! the change. Undoing restores the `undo` snapshots into the store,
//! redoing restores the `redo` ones, so an entry can be replayed in either
//! direction any number of times.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::annotations::Annotation;
use crate::format::ClientId;

/// Kind of change recorded in the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HistoryAction {
    ChangedLabel,
    ChangedAttributes,
    ChangedPoints,
    ChangedRotation,
    ChangedOutside,
    ChangedOccluded,
    ChangedZOrder,
    ChangedKeyframe,
    ChangedLock,
    ChangedPinned,
    ChangedColor,
    ChangedHidden,
    ChangedDescriptions,
    MergedObjects,
    SplittedTrack,
    GroupedObjects,
    JoinedObjects,
    SlicedObject,
    CreatedObjects,
    RemovedObject,
    RemovedUnderlyingPixels,
    ClearedFrames,
}

/// Anything that can take annotation snapshots back.
pub trait Restore {
    /// Replaces (or inserts) every snapshot by client id.
    fn restore(&mut self, snapshots: &[Annotation]);
}

/// One recorded change.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub undo: Vec<Annotation>,
    pub redo: Vec<Annotation>,
    pub client_ids: Vec<ClientId>,
    pub frame: u32,
}

/// History limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of undoable entries.
    pub capacity: usize,
    /// Per-kind limits applied on top of `capacity`.
    pub quotas: BTreeMap<HistoryAction, usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            quotas: BTreeMap::from([(HistoryAction::RemovedUnderlyingPixels, 20)]),
        }
    }
}

/// Summary of both stacks, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HistoryEntries {
    pub undo: Vec<(HistoryAction, u32)>,
    pub redo: Vec<(HistoryAction, u32)>,
}

#[derive(Debug, Default)]
pub struct History {
    config: HistoryConfig,
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    frozen: bool,
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            frozen: false,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Records a change. Does nothing while frozen.
    pub fn record(
        &mut self,
        action: HistoryAction,
        undo: Vec<Annotation>,
        redo: Vec<Annotation>,
        client_ids: Vec<ClientId>,
        frame: u32,
    ) {
        if self.frozen {
            return;
        }

        self.undo_stack.push_back(HistoryEntry {
            action,
            undo,
            redo,
            client_ids,
            frame,
        });
        self.redo_stack.clear();

        if let Some(&quota) = self.config.quotas.get(&action) {
            let count = self.undo_stack.iter().filter(|e| e.action == action).count();
            if count > quota {
                if let Some(index) = self.undo_stack.iter().position(|e| e.action == action) {
                    self.undo_stack.remove(index);
                    tracing::debug!(?action, quota, "History quota exceeded, oldest entry dropped");
                }
            }
        }

        while self.undo_stack.len() > self.config.capacity {
            if let Some(evicted) = self.undo_stack.pop_front() {
                tracing::debug!(action = ?evicted.action, "History entry evicted");
            }
        }

        tracing::debug!(?action, frame, undo_depth = self.undo_stack.len(), "History entry pushed");
    }

    /// Undoes up to `count` entries and returns the affected client ids.
    pub fn undo(&mut self, count: usize, target: &mut impl Restore) -> Vec<ClientId> {
        let mut affected = BTreeSet::new();
        for _ in 0..count {
            let Some(entry) = self.undo_stack.pop_back() else {
                break;
            };
            target.restore(&entry.undo);
            affected.extend(entry.client_ids.iter().copied());
            tracing::debug!(action = ?entry.action, frame = entry.frame, "Undo");
            self.redo_stack.push(entry);
        }
        affected.into_iter().collect()
    }

    /// Redoes up to `count` entries and returns the affected client ids.
    pub fn redo(&mut self, count: usize, target: &mut impl Restore) -> Vec<ClientId> {
        let mut affected = BTreeSet::new();
        for _ in 0..count {
            let Some(entry) = self.redo_stack.pop() else {
                break;
            };
            target.restore(&entry.redo);
            affected.extend(entry.client_ids.iter().copied());
            tracing::debug!(action = ?entry.action, frame = entry.frame, "Redo");
            self.undo_stack.push_back(entry);
        }
        affected.into_iter().collect()
    }

    /// Suspends (`true`) or resumes (`false`) recording.
    pub fn freeze(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// The most recent undoable entry.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.undo_stack.back()
    }

    pub fn entries(&self) -> HistoryEntries {
        HistoryEntries {
            undo: self.undo_stack.iter().map(|e| (e.action, e.frame)).collect(),
            redo: self.redo_stack.iter().map(|e| (e.action, e.frame)).collect(),
        }
    }
}
