//! Error types for the monitor layer.

use crate::network::InterfaceId;
use thiserror::Error;

/// Error returned by a hanging-get [`Watch`](super::Watcher::watch) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WatchError {
    /// A second `watch()` was issued while one was already pending.
    ///
    /// This is a protocol violation: the session is torn down and the
    /// call that was pending resolves with [`WatchError::Canceled`].
    #[error("Watch already pending on this session")]
    AlreadyPending,

    /// The pending call was resolved because the session closed.
    #[error("Watch canceled: session closed")]
    Canceled,

    /// The session was already closed when `watch()` was called.
    #[error("Session is closed")]
    Closed,
}

/// Error raised by the dispatcher when the owning stack reports a mutation
/// that contradicts what it reported before.
///
/// These never reach watchers; the dispatcher logs them and drops the event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The before/after pair does not describe a consistent transition.
    #[error("Internal inconsistency for interface {id}: {reason}")]
    InternalInconsistency {
        /// The interface the mutation referred to.
        id: InterfaceId,
        /// What was inconsistent.
        reason: &'static str,
    },
}

impl DispatchError {
    pub(crate) const fn inconsistent(id: InterfaceId, reason: &'static str) -> Self {
        Self::InternalInconsistency { id, reason }
    }
}

/// Error raised by [`SnapshotMirror`](super::SnapshotMirror) when an event
/// stream violates the delivery invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    /// An `Existing` event arrived after `Idle`.
    #[error("Existing event for interface {0} after idle")]
    ExistingAfterIdle(InterfaceId),

    /// A second `Idle` event arrived.
    #[error("Duplicate idle event")]
    DuplicateIdle,

    /// `Added` or `Existing` for an interface that is already known.
    #[error("Duplicate interface {0}")]
    DuplicateInterface(InterfaceId),

    /// `Changed` or `Removed` for an interface that is not known.
    #[error("Unknown interface {0}")]
    UnknownInterface(InterfaceId),

    /// A change event carried no changed fields.
    #[error("Empty change for interface {0}")]
    EmptyChange(InterfaceId),

    /// A non-replay event arrived before the replay finished.
    #[error("Event for interface {0} before idle")]
    BeforeIdle(InterfaceId),
}
