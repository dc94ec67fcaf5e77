//! Registry of live sessions.
//!
//! `SessionRegistry` stores non-owning weak references to sessions, so a
//! tick driver can reach every live connection without keeping closed ones
//! alive. Dead entries are pruned lazily at lookup time or in bulk.

use std::sync::{Arc, Weak};

use dashmap::DashMap;

use super::{ConnectionId, PulseError, PulseStats, PulsingSession, Session};

/// Concurrent registry of sessions keyed by [`ConnectionId`].
pub struct SessionRegistry<S>(DashMap<ConnectionId, Weak<S>>);

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self { Self(DashMap::new()) }
}

impl<S: Session> SessionRegistry<S> {
    /// Retrieve the session for `id` if it is still alive.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<S>> {
        let guard = self.0.get(id);
        let session = guard.as_ref().and_then(|weak| weak.upgrade());
        drop(guard);
        if session.is_none() {
            self.0.remove_if(id, |_, weak| weak.strong_count() == 0);
        }
        session
    }

    /// Register a session under its own id.
    pub fn insert(&self, session: &Arc<S>) { self.0.insert(session.id(), Arc::downgrade(session)); }

    /// Remove a session, typically on connection teardown.
    pub fn remove(&self, id: &ConnectionId) { self.0.remove(id); }

    /// Remove all stale weak references.
    ///
    /// `DashMap::retain` acquires per-bucket write locks, so other operations
    /// may contend briefly while the registry is pruned.
    pub fn prune(&self) { self.0.retain(|_, weak| weak.strong_count() > 0); }

    /// Prune stale weak references, then collect the live sessions.
    #[must_use]
    pub fn active_sessions(&self) -> Vec<Arc<S>> {
        let mut sessions = Vec::with_capacity(self.0.len());
        self.0.retain(|_, weak| match weak.upgrade() {
            Some(session) => {
                sessions.push(session);
                true
            }
            None => false,
        });
        sessions
    }

    /// Prune stale weak references, then return the ids of live sessions.
    #[must_use]
    pub fn active_ids(&self) -> Vec<ConnectionId> {
        let mut ids = Vec::with_capacity(self.0.len());
        self.0.retain(|id, weak| {
            if weak.strong_count() > 0 {
                ids.push(*id);
                true
            } else {
                false
            }
        });
        ids
    }
}

impl SessionRegistry<PulsingSession> {
    /// Pulse every live session once.
    ///
    /// Sessions are collected before any pulse runs, so no registry lock is
    /// held while handlers execute.
    pub fn pulse_all(&self) -> Vec<(ConnectionId, Result<PulseStats, PulseError>)> {
        self.active_sessions()
            .into_iter()
            .map(|session| (session.id(), session.pulse()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        message::Message,
        session::State,
        test_helpers::{Ping, RecordingHandler, pulsing_session},
    };

    #[test]
    fn dropped_sessions_are_pruned_on_lookup() {
        let registry = SessionRegistry::default();
        let (session, _transport) = pulsing_session(RecordingHandler::default())
            .expect("demo session");
        let session = Arc::new(session);
        let id = session.id();
        registry.insert(&session);
        assert!(registry.get(&id).is_some());

        drop(session);
        assert!(registry.get(&id).is_none());
        assert!(registry.active_ids().is_empty());
    }

    #[test]
    fn pulse_all_drains_each_session() {
        let registry = SessionRegistry::default();
        let handler = RecordingHandler::default();
        let (session, transport) = pulsing_session(handler.clone()).expect("demo session");
        let session = Arc::new(session);
        registry.insert(&session);

        session.set_state(State::Open);
        session.message_received(Ping(1).into_ref());
        let results = registry.pulse_all();

        assert_eq!(results.len(), 1);
        let (id, stats) = &results[0];
        assert_eq!(*id, session.id());
        assert_eq!(stats.as_ref().map(|s| s.delivered).ok(), Some(1));
        assert_eq!(handler.count(), 1);
        assert_eq!(transport.frame_count(), 0);
    }
}
