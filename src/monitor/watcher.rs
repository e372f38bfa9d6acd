//! Client handle for a watcher session.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio_stream::Stream;
use tracing::debug;

use super::change::Event;
use super::error::WatchError;
use super::session::{Session, SessionId, SessionPhase};

/// An observer's handle to one watcher session.
///
/// Clones share the same session. When the last clone is dropped the
/// session is closed, as if the client connection had been lost.
///
/// # Example
///
/// ```
/// use netif_watch::monitor::{Event, WatcherRegistry};
/// use netif_watch::network::Snapshot;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let registry = WatcherRegistry::new();
/// let watcher = registry.open_session(&Snapshot::new());
///
/// assert_eq!(watcher.watch().await, Ok(Event::Idle));
/// watcher.close();
/// assert!(registry.is_empty());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Watcher {
    inner: Arc<WatcherInner>,
}

#[derive(Debug)]
struct WatcherInner {
    session: Arc<Session>,
}

impl Drop for WatcherInner {
    fn drop(&mut self) {
        self.session.close();
    }
}

impl Watcher {
    pub(super) fn new(session: Arc<Session>) -> Self {
        Self {
            inner: Arc::new(WatcherInner { session }),
        }
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.session.id()
    }

    /// Returns the session's current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.session.phase()
    }

    /// Returns true once the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.phase() == SessionPhase::Closed
    }

    /// Waits for the next event.
    ///
    /// Returns immediately when events are queued. Otherwise suspends until
    /// the next event is dispatched or the session closes.
    ///
    /// There is no built-in timeout. Dropping the future while it is
    /// suspended closes the session, so racing it against a deadline is the
    /// same as calling [`close`](Self::close) when the deadline fires.
    ///
    /// # Errors
    ///
    /// - [`WatchError::AlreadyPending`] if another call is already pending;
    ///   the session is closed as a consequence.
    /// - [`WatchError::Canceled`] if the session closed while suspended.
    /// - [`WatchError::Closed`] if the session was already closed.
    pub async fn watch(&self) -> Result<Event, WatchError> {
        self.inner.session.watch().await
    }

    /// Closes the session. Safe to call more than once.
    pub fn close(&self) {
        self.inner.session.close();
    }

    /// Converts this watcher into a stream of events.
    ///
    /// The stream ends when the session closes or a watch fails.
    #[must_use]
    pub fn into_stream(self) -> WatchStream {
        WatchStream {
            watcher: self,
            pending: None,
            done: false,
        }
    }
}

type PendingWatch = Pin<Box<dyn Future<Output = Result<Event, WatchError>> + Send>>;

/// A stream of events from one watcher session.
///
/// Returned by [`Watcher::into_stream`]. Dropping the stream closes the
/// session.
pub struct WatchStream {
    watcher: Watcher,
    pending: Option<PendingWatch>,
    done: bool,
}

impl std::fmt::Debug for WatchStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchStream")
            .field("watcher", &self.watcher)
            .field("pending", &self.pending.is_some())
            .field("done", &self.done)
            .finish()
    }
}

impl WatchStream {
    /// Returns the underlying watcher.
    #[must_use]
    pub const fn watcher(&self) -> &Watcher {
        &self.watcher
    }
}

impl Stream for WatchStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }

        let future = this.pending.get_or_insert_with(|| {
            let watcher = this.watcher.clone();
            Box::pin(async move { watcher.watch().await })
        });

        match future.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                this.pending = None;
                match result {
                    Ok(event) => Poll::Ready(Some(event)),
                    Err(e) => {
                        debug!(session_id = %this.watcher.id(), "Watch stream ended: {e}");
                        this.done = true;
                        Poll::Ready(None)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::WatcherRegistry;
    use crate::network::{InterfaceId, InterfaceProperties, Snapshot};
    use std::time::Duration;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn watch_delegates_to_session() {
        let registry = WatcherRegistry::new();
        let watcher = registry.open_session(&Snapshot::new());

        assert_eq!(watcher.watch().await, Ok(Event::Idle));
        assert_eq!(watcher.phase(), SessionPhase::Idle);
    }

    #[test]
    fn dropping_last_clone_closes_session() {
        let registry = WatcherRegistry::new();
        let watcher = registry.open_session(&Snapshot::new());
        let clone = watcher.clone();

        drop(watcher);
        assert_eq!(registry.len(), 1);
        assert!(!clone.is_closed());

        drop(clone);
        assert!(registry.is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let registry = WatcherRegistry::new();
        let watcher = registry.open_session(&Snapshot::new());

        watcher.close();
        watcher.close();

        assert!(watcher.is_closed());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn stream_yields_replay_then_changes() {
        let registry = WatcherRegistry::new();
        let id = InterfaceId::new(1);
        let snapshot = Snapshot::from([(id, InterfaceProperties::new(id))]);
        let mut stream = registry.open_session(&snapshot).into_stream();

        assert_eq!(
            stream.next().await,
            Some(Event::Existing(InterfaceProperties::new(id)))
        );
        assert_eq!(stream.next().await, Some(Event::Idle));

        registry.dispatch(&Event::Removed(id));
        assert_eq!(stream.next().await, Some(Event::Removed(id)));
    }

    #[tokio::test]
    async fn stream_ends_when_session_closes() {
        let registry = WatcherRegistry::new();
        let mut stream = registry.open_session(&Snapshot::new()).into_stream();
        assert_eq!(stream.next().await, Some(Event::Idle));

        let closer = stream.watcher().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.close();
        });

        assert_eq!(stream.next().await, None);
        assert_eq!(stream.next().await, None);
    }

    #[test]
    fn dropping_stream_closes_session() {
        let registry = WatcherRegistry::new();
        let stream = registry.open_session(&Snapshot::new()).into_stream();
        assert_eq!(registry.len(), 1);

        drop(stream);
        assert!(registry.is_empty());
    }
}
