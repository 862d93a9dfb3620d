//! In-process session store.

use dashmap::DashMap;

use kiosk_core::{Session, SessionId};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "kiosk_session";

/// Concurrent map of active sessions keyed by id.
///
/// Sessions never survive a restart; there is no persistence and no expiry
/// sweep beyond explicit logout.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl SessionStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Creates and registers a fresh session, returning a copy of it.
    pub fn create(&self) -> Session {
        let session = Session::new();
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Records a request against the session, returning the updated record.
    ///
    /// Returns `None` if the id is unknown (e.g. after logout).
    pub fn touch(&self, id: &SessionId) -> Option<Session> {
        self.sessions.get_mut(id).map(|mut entry| {
            entry.touch();
            entry.clone()
        })
    }

    /// Returns a copy of the session record, if present.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.clone())
    }

    /// Removes the session, returning its final record.
    pub fn remove(&self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Returns the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no session is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let session = store.create();
        assert_eq!(store.len(), 1);

        let fetched = store.get(&session.id).unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.requests, 0);
    }

    #[test]
    fn test_touch_updates_counters() {
        let store = SessionStore::new();
        let session = store.create();

        let touched = store.touch(&session.id).unwrap();
        assert_eq!(touched.requests, 1);

        let touched = store.touch(&session.id).unwrap();
        assert_eq!(touched.requests, 2);
    }

    #[test]
    fn test_remove_destroys_session() {
        let store = SessionStore::new();
        let session = store.create();

        assert!(store.remove(&session.id).is_some());
        assert!(store.get(&session.id).is_none());
        assert!(store.touch(&session.id).is_none());
    }
}
