//! Per-observer session state.
//!
//! A session owns one observer's event queue and its single hanging-get
//! slot. All state lives behind one per-session lock that is independent of
//! the registry lock and of every other session.
//!
//! # Phases
//!
//! ```text
//! (replay) ──> Queued ⇄ Idle ⇄ Blocked
//!                 │       │       │
//!                 └───────┴───────┴──> Closed
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Weak;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use super::change::Event;
use super::error::WatchError;
use super::registry::RegistryInner;
use crate::network::Snapshot;

/// Identifier of a watcher session, unique within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub(super) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No queued events and no pending call.
    Idle,
    /// Events are buffered, waiting to be watched.
    Queued,
    /// One `watch()` call is suspended awaiting the next event.
    Blocked,
    /// Terminal: the session has been closed.
    Closed,
}

type Waiter = oneshot::Sender<Result<Event, WatchError>>;

#[derive(Debug, Default)]
struct SessionState {
    queue: VecDeque<Event>,
    waiter: Option<Waiter>,
    closed: bool,
}

impl SessionState {
    /// Marks the state closed and returns the waiter to cancel, if any.
    ///
    /// Returns `None` for the outer option if the state was already closed.
    fn teardown(&mut self) -> Option<Option<Waiter>> {
        if self.closed {
            return None;
        }
        self.closed = true;
        self.queue.clear();
        Some(self.waiter.take())
    }
}

/// Outcome of the synchronous half of a `watch()` call.
enum WatchStart {
    Ready(Event),
    Pending(oneshot::Receiver<Result<Event, WatchError>>),
}

#[derive(Debug)]
pub(super) struct Session {
    id: SessionId,
    state: Mutex<SessionState>,
    registry: Weak<RegistryInner>,
}

impl Session {
    /// Creates a session whose queue replays `snapshot`: one `Existing`
    /// per interface in ascending id order, then a single `Idle`.
    pub(super) fn replay(id: SessionId, snapshot: &Snapshot, registry: Weak<RegistryInner>) -> Self {
        let mut queue: VecDeque<Event> = snapshot
            .values()
            .cloned()
            .map(Event::Existing)
            .collect();
        queue.push_back(Event::Idle);

        Self {
            id,
            state: Mutex::new(SessionState {
                queue,
                waiter: None,
                closed: false,
            }),
            registry,
        }
    }

    pub(super) const fn id(&self) -> SessionId {
        self.id
    }

    pub(super) fn phase(&self) -> SessionPhase {
        let state = self.state.lock();
        if state.closed {
            SessionPhase::Closed
        } else if state.waiter.is_some() {
            SessionPhase::Blocked
        } else if state.queue.is_empty() {
            SessionPhase::Idle
        } else {
            SessionPhase::Queued
        }
    }

    /// Delivers an event: hands it to the waiter if one is blocked,
    /// otherwise appends it to the queue. No-op once closed.
    pub(super) fn push(&self, event: Event) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }

        let event = match state.waiter.take() {
            Some(waiter) => match waiter.send(Ok(event)) {
                Ok(()) => {
                    trace!(session_id = %self.id, "Event handed to blocked watcher");
                    return;
                }
                // The receiver is gone; its caller is closing the session.
                Err(Ok(event)) => event,
                Err(Err(_)) => return,
            },
            None => event,
        };

        state.queue.push_back(event);
        trace!(session_id = %self.id, queued = state.queue.len(), "Event queued");
    }

    /// The hanging get.
    ///
    /// Returns the oldest queued event immediately if there is one;
    /// otherwise suspends until an event is pushed or the session closes.
    /// Dropping the returned future while it is suspended closes the session.
    pub(super) async fn watch(&self) -> Result<Event, WatchError> {
        let receiver = match self.begin_watch()? {
            WatchStart::Ready(event) => return Ok(event),
            WatchStart::Pending(receiver) => receiver,
        };

        let mut guard = CloseOnDrop::new(self);
        let result = receiver.await.unwrap_or(Err(WatchError::Canceled));
        guard.disarm();
        result
    }

    fn begin_watch(&self) -> Result<WatchStart, WatchError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(WatchError::Closed);
        }

        if state.waiter.is_some() {
            let waiter = state.teardown().flatten();
            drop(state);
            warn!(session_id = %self.id, "Concurrent watch on one session; closing it");
            self.finish_close(waiter);
            return Err(WatchError::AlreadyPending);
        }

        if let Some(event) = state.queue.pop_front() {
            return Ok(WatchStart::Ready(event));
        }

        let (sender, receiver) = oneshot::channel();
        state.waiter = Some(sender);
        Ok(WatchStart::Pending(receiver))
    }

    /// Closes the session. Idempotent.
    ///
    /// Discards queued events, resolves a blocked call with
    /// [`WatchError::Canceled`] and removes the session from its registry
    /// before returning.
    pub(super) fn close(&self) {
        let Some(waiter) = self.state.lock().teardown() else {
            return;
        };
        self.finish_close(waiter);
    }

    fn finish_close(&self, waiter: Option<Waiter>) {
        if let Some(waiter) = waiter {
            // The receiver may already be gone if its future was dropped.
            let _ = waiter.send(Err(WatchError::Canceled));
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        debug!(session_id = %self.id, "Watcher session closed");
    }
}

/// Closes the session if a suspended `watch()` future is dropped.
struct CloseOnDrop<'a> {
    session: &'a Session,
    armed: bool,
}

impl<'a> CloseOnDrop<'a> {
    const fn new(session: &'a Session) -> Self {
        Self {
            session,
            armed: true,
        }
    }

    const fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(session_id = %self.session.id, "Pending watch abandoned");
            self.session.close();
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
