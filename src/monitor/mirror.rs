//! Client-side reconstruction of interface state from watcher events.

use tracing::trace;

use super::change::Event;
use super::error::MirrorError;
use crate::network::{InterfaceId, Snapshot};

/// Folds a watcher's event stream back into a [`Snapshot`].
///
/// Every event is checked against the delivery invariants before it is
/// applied; a violating event is rejected and leaves the mirror unchanged.
#[derive(Debug, Clone, Default)]
pub struct SnapshotMirror {
    snapshot: Snapshot,
    idle: bool,
}

impl SnapshotMirror {
    /// Creates an empty mirror awaiting the replay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the reconstructed snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Returns true once the `Idle` event has been applied.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.idle
    }

    /// Applies one event.
    ///
    /// # Errors
    ///
    /// Returns a [`MirrorError`] if the event violates ordering or refers to
    /// an interface in the wrong state.
    pub fn apply(&mut self, event: Event) -> Result<(), MirrorError> {
        trace!(event = event.label(), "Mirroring event");
        match event {
            Event::Existing(props) => {
                if self.idle {
                    return Err(MirrorError::ExistingAfterIdle(props.id));
                }
                if self.snapshot.contains_key(&props.id) {
                    return Err(MirrorError::DuplicateInterface(props.id));
                }
                self.snapshot.insert(props.id, props);
            }
            Event::Idle => {
                if self.idle {
                    return Err(MirrorError::DuplicateIdle);
                }
                self.idle = true;
            }
            Event::Added(props) => {
                self.require_idle(props.id)?;
                if self.snapshot.contains_key(&props.id) {
                    return Err(MirrorError::DuplicateInterface(props.id));
                }
                self.snapshot.insert(props.id, props);
            }
            Event::Changed(diff) => {
                self.require_idle(diff.id)?;
                if diff.is_empty() {
                    return Err(MirrorError::EmptyChange(diff.id));
                }
                let props = self
                    .snapshot
                    .get_mut(&diff.id)
                    .ok_or(MirrorError::UnknownInterface(diff.id))?;
                diff.apply_to(props);
            }
            Event::Removed(id) => {
                self.require_idle(id)?;
                if self.snapshot.remove(&id).is_none() {
                    return Err(MirrorError::UnknownInterface(id));
                }
            }
        }
        Ok(())
    }

    const fn require_idle(&self, id: InterfaceId) -> Result<(), MirrorError> {
        if self.idle {
            Ok(())
        } else {
            Err(MirrorError::BeforeIdle(id))
        }
    }
}
