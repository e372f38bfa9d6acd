//! File-based state persistence implementation.

use std::collections::btree_map::Entry;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::network::{InterfaceProperties, Snapshot};

use super::{LoadResult, StateError, StateStore};

/// Current state file format version.
///
/// Increment this when making breaking changes to the format.
const STATE_FILE_VERSION: u32 = 1;

/// On-disk state file format.
///
/// Incompatible versions are treated as corrupted.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,

    /// Unix timestamp of the save, for debugging only.
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_at: Option<String>,

    /// Interfaces in ascending id order.
    interfaces: Vec<InterfaceProperties>,
}

impl StateFile {
    fn new(snapshot: &Snapshot) -> Self {
        Self {
            version: STATE_FILE_VERSION,
            saved_at: Some(unix_timestamp_now()),
            interfaces: snapshot.values().cloned().collect(),
        }
    }

    fn into_snapshot(self) -> Result<Snapshot, String> {
        let mut snapshot = Snapshot::new();
        for props in self.interfaces {
            if props.id.get() == u64::MAX {
                return Err(format!(
                    "Interface id {} leaves no id for new interfaces",
                    props.id
                ));
            }
            match snapshot.entry(props.id) {
                Entry::Occupied(entry) => {
                    return Err(format!("Duplicate interface id {}", entry.key()));
                }
                Entry::Vacant(entry) => {
                    entry.insert(props);
                }
            }
        }
        Ok(snapshot)
    }
}

fn unix_timestamp_now() -> String {
    use std::time::SystemTime;

    let duration = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", duration.as_secs())
}

/// File-based implementation of [`StateStore`].
///
/// Stores the interface snapshot as JSON with atomic write semantics:
/// the file is written to `{path}.tmp` and then renamed over `{path}`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Creates a new file-based state store at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save_blocking(path: &Path, state: &StateFile) -> Result<(), StateError> {
        let content = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StateError::Write)?;
            }
        }

        // state.json -> state.json.tmp, not state.tmp
        let temp_path = PathBuf::from(format!("{}.tmp", path.display()));

        std::fs::write(&temp_path, content).map_err(StateError::Write)?;
        std::fs::rename(&temp_path, path).map_err(StateError::Write)?;

        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> LoadResult {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return LoadResult::NotFound,
            Err(e) => {
                return LoadResult::Corrupted {
                    reason: format!("Failed to read file: {e}"),
                };
            }
        };

        let state = match serde_json::from_str::<StateFile>(&content) {
            Ok(state) => state,
            Err(e) => {
                return LoadResult::Corrupted {
                    reason: format!("Invalid JSON: {e}"),
                };
            }
        };

        if state.version != STATE_FILE_VERSION {
            return LoadResult::Corrupted {
                reason: format!(
                    "Incompatible version: expected {STATE_FILE_VERSION}, got {}",
                    state.version
                ),
            };
        }

        match state.into_snapshot() {
            Ok(snapshot) => LoadResult::Loaded(snapshot),
            Err(reason) => LoadResult::Corrupted { reason },
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StateError> {
        let path = self.path.clone();
        let state = StateFile::new(snapshot);

        tokio::task::spawn_blocking(move || Self::save_blocking(&path, &state))
            .await
            .map_err(StateError::Task)?
    }
}
