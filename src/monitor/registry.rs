//! Registry of live watcher sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::change::Event;
use super::session::{Session, SessionId};
use super::watcher::Watcher;
use crate::network::Snapshot;

#[derive(Debug, Default)]
pub(super) struct RegistryInner {
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
    next_id: AtomicU64,
}

impl RegistryInner {
    pub(super) fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.lock().remove(&id).is_some();
        if removed {
            trace!(session_id = %id, "Session removed from registry");
        }
        removed
    }
}

/// The set of open watcher sessions.
///
/// The registry lock guards membership only and is held for O(1) work:
/// insert, remove, or copying the session list for fan-out. Delivery to
/// each session happens after the lock is released, under that session's
/// own lock, so a slow observer never stalls the others.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct WatcherRegistry {
    inner: Arc<RegistryInner>,
}

impl WatcherRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session replaying `snapshot` and registers it.
    ///
    /// The caller must hold whatever lock serializes mutations of the
    /// snapshot, so that no event is missed or duplicated between the
    /// replay and the first dispatched change.
    #[must_use]
    pub fn open_session(&self, snapshot: &Snapshot) -> Watcher {
        let id = SessionId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let session = Arc::new(Session::replay(id, snapshot, Arc::downgrade(&self.inner)));

        self.inner.sessions.lock().insert(id, Arc::clone(&session));
        debug!(session_id = %id, interfaces = snapshot.len(), "Watcher session opened");

        Watcher::new(session)
    }

    /// Delivers `event` to every open session.
    ///
    /// Returns the number of sessions the event was offered to.
    pub fn dispatch(&self, event: &Event) -> usize {
        let sessions: Vec<Arc<Session>> = self.inner.sessions.lock().values().cloned().collect();

        for session in &sessions {
            session.push(event.clone());
        }

        sessions.len()
    }

    /// Removes a session from the live set.
    ///
    /// Returns `true` if the session was registered.
    pub fn remove_session(&self, id: SessionId) -> bool {
        self.inner.remove(id)
    }

    /// Returns the number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Returns true if no session is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every open session, canceling any blocked calls.
    pub fn close_all(&self) {
        let sessions: Vec<Arc<Session>> = self.inner.sessions.lock().values().cloned().collect();
        let count = sessions.len();

        for session in sessions {
            session.close();
        }

        debug!(count, "Closed all watcher sessions");
    }
}
