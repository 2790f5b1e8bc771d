//! Open annotation sessions of one process.
//!
//! Each session owns one [`Collection`]. Sessions never share objects or
//! history; callers look a collection up by its [`SessionId`] and close the
//! session when the job is done.

use std::collections::BTreeMap;
use std::fmt;

use crate::collection::Collection;

/// Handle of an open session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Returns the underlying u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Collections of the open sessions, keyed by session id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, Collection>,
    next_id: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `collection` under a new id. Ids are not reused after
    /// [`close`](Self::close).
    pub fn open(&mut self, collection: Collection) -> SessionId {
        self.next_id += 1;
        let id = SessionId(self.next_id);
        self.sessions.insert(id, collection);
        tracing::debug!(session = %id, open = self.sessions.len(), "Session opened");
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&Collection> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Collection> {
        self.sessions.get_mut(&id)
    }

    /// Drops the session and hands its collection back.
    pub fn close(&mut self, id: SessionId) -> Option<Collection> {
        let collection = self.sessions.remove(&id);
        if collection.is_some() {
            tracing::debug!(session = %id, open = self.sessions.len(), "Session closed");
        }
        collection
    }

    /// Ids of the open sessions, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.sessions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
