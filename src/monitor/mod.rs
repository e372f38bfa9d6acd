//! Watcher sessions over a network interface table.
//!
//! This module provides types and functions for:
//! - Representing watcher events ([`Event`], [`PropertiesDiff`])
//! - Computing minimal property diffs ([`compute_diff`])
//! - Hanging-get sessions ([`Watcher`], [`WatchStream`])
//! - Fanning committed mutations out to sessions ([`EventDispatcher`], [`WatcherRegistry`])
//! - Rebuilding state on the observer side ([`SnapshotMirror`])
//! - Error handling ([`WatchError`], [`DispatchError`], [`MirrorError`])

mod change;
mod dispatcher;
mod error;
mod mirror;
mod registry;
mod session;
mod watcher;

pub use change::{Event, PropertiesDiff, compute_diff};
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use error::{DispatchError, MirrorError, WatchError};
pub use mirror::SnapshotMirror;
pub use registry::WatcherRegistry;
pub use session::{SessionId, SessionPhase};
pub use watcher::{WatchStream, Watcher};
