// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use civic_core::ExternalId;
use dashmap::DashMap;

use crate::session::Session;

/// Holds the active conversation for each chat identity.
pub trait SessionStore: Send + Sync {
    fn get(&self, identity: &ExternalId) -> Option<Session>;

    fn put(&self, identity: &ExternalId, session: Session);

    /// Removes and returns the session, ending the conversation.
    fn take(&self, identity: &ExternalId) -> Option<Session>;

    fn active(&self) -> usize;
}

/// Sharded in-memory session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<ExternalId, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, identity: &ExternalId) -> Option<Session> {
        self.sessions.get(identity).map(|s| s.value().clone())
    }

    fn put(&self, identity: &ExternalId, session: Session) {
        self.sessions.insert(identity.clone(), session);
    }

    fn take(&self, identity: &ExternalId) -> Option<Session> {
        self.sessions.remove(identity).map(|(_, s)| s)
    }

    fn active(&self) -> usize {
        self.sessions.len()
    }
}
