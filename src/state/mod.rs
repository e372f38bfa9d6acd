//! Interface table persistence across restarts.
//!
//! This module provides abstractions for storing the final interface
//! snapshot on shutdown and seeding the table from it on the next start.

mod file;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use file::FileStateStore;

use std::io;

use thiserror::Error;

use crate::network::Snapshot;

/// Result of loading state from persistent storage.
///
/// Explicitly models all valid states to avoid ambiguity:
/// - Successfully loaded previous state
/// - No previous state exists (first run)
/// - State exists but is corrupted/unreadable
#[derive(Debug, Clone)]
pub enum LoadResult {
    /// Successfully loaded a previously saved snapshot.
    Loaded(Snapshot),

    /// No state file exists (first run or explicitly deleted).
    NotFound,

    /// State file exists but could not be parsed.
    /// Program should continue with an empty table and overwrite on next save.
    Corrupted {
        /// Reason for corruption (for logging/debugging).
        reason: String,
    },
}

impl LoadResult {
    /// Returns the loaded snapshot, or an empty one for `NotFound`/`Corrupted`.
    #[must_use]
    pub fn into_snapshot(self) -> Snapshot {
        match self {
            Self::Loaded(snapshot) => snapshot,
            Self::NotFound | Self::Corrupted { .. } => Snapshot::new(),
        }
    }

    /// Returns `true` if state was successfully loaded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Errors that can occur during state persistence operations.
///
/// Only covers write-side errors; read-side issues are modeled
/// as [`LoadResult`] variants to allow graceful degradation.
#[derive(Debug, Error)]
pub enum StateError {
    /// Failed to write the state file.
    #[error("Failed to write state file: {0}")]
    Write(#[source] io::Error),

    /// Failed to serialize state to JSON.
    #[error("Failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The blocking writer task did not complete.
    #[error("State writer task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}

/// Abstraction for persisting the interface table between program runs.
///
/// Implementations should:
/// - Use atomic writes to prevent corruption from crashes
/// - Handle missing files gracefully (return `LoadResult::NotFound`)
/// - Degrade gracefully on read errors (return `LoadResult::Corrupted`)
pub trait StateStore: Send + Sync {
    /// Loads previously saved state.
    fn load(&self) -> LoadResult;

    /// Saves the current snapshot for the next run.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn save(
        &self,
        snapshot: &Snapshot,
    ) -> impl std::future::Future<Output = Result<(), StateError>> + Send;
}
