//! Mutation hook that turns committed stack changes into watcher events.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use tracing::{error, trace};

use super::change::{Event, compute_diff};
use super::error::DispatchError;
use super::registry::WatcherRegistry;
use crate::network::{InterfaceId, InterfaceProperties, Snapshot};

/// What [`EventDispatcher::on_mutation`] did with a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// An event was fanned out.
    Delivered {
        /// Label of the delivered event (`added`, `changed`, `removed`).
        event: &'static str,
        /// Number of sessions the event was offered to.
        sessions: usize,
    },
    /// Nothing observable changed; no event was produced.
    Unchanged,
    /// The mutation was inconsistent with earlier ones and was dropped.
    Dropped(DispatchError),
}

/// Hook invoked by the owning stack after each committed mutation.
///
/// The dispatcher remembers which interfaces it has announced (seeded from
/// the snapshot it was created with), so it can refuse transitions that
/// would break the per-session event invariants: a change or removal for an
/// interface watchers never saw, or a second addition of a live interface.
///
/// Classification and fan-out happen under one internal lock, so events
/// reach every session in the order `on_mutation` was called.
#[derive(Debug)]
pub struct EventDispatcher {
    registry: WatcherRegistry,
    announced: Mutex<BTreeSet<InterfaceId>>,
}

impl EventDispatcher {
    /// Creates a dispatcher for `registry` whose known interfaces are those
    /// in `snapshot`.
    #[must_use]
    pub fn new(registry: WatcherRegistry, snapshot: &Snapshot) -> Self {
        Self {
            registry,
            announced: Mutex::new(snapshot.keys().copied().collect()),
        }
    }

    /// Returns the registry events are fanned out to.
    #[must_use]
    pub const fn registry(&self) -> &WatcherRegistry {
        &self.registry
    }

    /// Reports one committed mutation of interface `id`.
    ///
    /// `before` is `None` when the interface was just added and `after` is
    /// `None` when it was just removed. Must be called synchronously after
    /// the commit; it never blocks beyond short lock sections.
    ///
    /// Inconsistent input is logged and dropped; it is never surfaced to
    /// watchers.
    pub fn on_mutation(
        &self,
        id: InterfaceId,
        before: Option<&InterfaceProperties>,
        after: Option<&InterfaceProperties>,
    ) -> DispatchOutcome {
        let mut announced = self.announced.lock();

        let event = match classify(&announced, id, before, after) {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!(interface_id = %id, "Mutation produced no diff");
                return DispatchOutcome::Unchanged;
            }
            Err(e) => {
                error!(interface_id = %id, "Dropping mutation: {e}");
                return DispatchOutcome::Dropped(e);
            }
        };

        match &event {
            Event::Added(_) => {
                announced.insert(id);
            }
            Event::Removed(_) => {
                announced.remove(&id);
            }
            _ => {}
        }

        let sessions = self.registry.dispatch(&event);
        trace!(interface_id = %id, event = event.label(), sessions, "Event dispatched");

        DispatchOutcome::Delivered {
            event: event.label(),
            sessions,
        }
    }
}

/// Classifies a before/after pair into the event watchers should see.
fn classify(
    announced: &BTreeSet<InterfaceId>,
    id: InterfaceId,
    before: Option<&InterfaceProperties>,
    after: Option<&InterfaceProperties>,
) -> Result<Option<Event>, DispatchError> {
    for props in before.into_iter().chain(after) {
        if props.id != id {
            return Err(DispatchError::inconsistent(
                id,
                "properties carry a different id",
            ));
        }
    }

    let known = announced.contains(&id);
    match (before, after) {
        (None, None) => Ok(None),
        (None, Some(after)) => {
            if known {
                return Err(DispatchError::inconsistent(id, "added twice"));
            }
            Ok(Some(Event::Added(after.clone())))
        }
        (Some(_), None) => {
            if !known {
                return Err(DispatchError::inconsistent(id, "removed before added"));
            }
            Ok(Some(Event::Removed(id)))
        }
        (Some(before), Some(after)) => {
            if !known {
                return Err(DispatchError::inconsistent(
                    id,
                    "missing from the prior snapshot",
                ));
            }
            Ok(compute_diff(before, after).map(Event::Changed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{PropertiesDiff, Watcher};

    fn props(raw: u64) -> InterfaceProperties {
        InterfaceProperties::new(InterfaceId::new(raw))
    }

    fn id(raw: u64) -> InterfaceId {
        InterfaceId::new(raw)
    }

    /// A dispatcher knowing interface 1, with one watcher past its replay.
    async fn setup() -> (EventDispatcher, Watcher) {
        let snapshot = Snapshot::from([(id(1), props(1))]);
        let registry = WatcherRegistry::new();
        let dispatcher = EventDispatcher::new(registry.clone(), &snapshot);
        let watcher = registry.open_session(&snapshot);
        assert_eq!(watcher.watch().await, Ok(Event::Existing(props(1))));
        assert_eq!(watcher.watch().await, Ok(Event::Idle));
        (dispatcher, watcher)
    }

    #[tokio::test]
    async fn added_interface_is_announced() {
        let (dispatcher, watcher) = setup().await;

        let outcome = dispatcher.on_mutation(id(2), None, Some(&props(2)));

        assert_eq!(
            outcome,
            DispatchOutcome::Delivered {
                event: "added",
                sessions: 1
            }
        );
        assert_eq!(watcher.watch().await, Ok(Event::Added(props(2))));
    }

    #[tokio::test]
    async fn removed_interface_carries_only_id() {
        let (dispatcher, watcher) = setup().await;

        dispatcher.on_mutation(id(1), Some(&props(1)), None);

        assert_eq!(watcher.watch().await, Ok(Event::Removed(id(1))));
    }

    #[tokio::test]
    async fn changed_interface_carries_diff() {
        let (dispatcher, watcher) = setup().await;

        dispatcher.on_mutation(id(1), Some(&props(1)), Some(&props(1).with_online(true)));

        assert_eq!(
            watcher.watch().await,
            Ok(Event::Changed(PropertiesDiff {
                online: Some(true),
                ..PropertiesDiff::empty(id(1))
            }))
        );
    }

    #[tokio::test]
    async fn identical_before_and_after_is_unchanged() {
        let (dispatcher, watcher) = setup().await;

        let outcome = dispatcher.on_mutation(id(1), Some(&props(1)), Some(&props(1)));

        assert_eq!(outcome, DispatchOutcome::Unchanged);
        assert_eq!(watcher.phase(), crate::monitor::SessionPhase::Idle);
    }

    #[tokio::test]
    async fn change_for_unknown_interface_is_dropped() {
        let (dispatcher, watcher) = setup().await;

        let outcome =
            dispatcher.on_mutation(id(9), Some(&props(9)), Some(&props(9).with_online(true)));

        assert!(matches!(
            outcome,
            DispatchOutcome::Dropped(DispatchError::InternalInconsistency { .. })
        ));
        assert_eq!(watcher.phase(), crate::monitor::SessionPhase::Idle);
    }

    #[tokio::test]
    async fn double_add_is_dropped() {
        let (dispatcher, _watcher) = setup().await;

        let outcome = dispatcher.on_mutation(id(1), None, Some(&props(1)));

        assert!(matches!(outcome, DispatchOutcome::Dropped(_)));
    }

    #[tokio::test]
    async fn mismatched_ids_are_dropped() {
        let (dispatcher, _watcher) = setup().await;

        let outcome = dispatcher.on_mutation(id(1), Some(&props(1)), Some(&props(2)));

        assert!(matches!(outcome, DispatchOutcome::Dropped(_)));
    }

    #[tokio::test]
    async fn removal_is_terminal_until_re_added() {
        let (dispatcher, watcher) = setup().await;

        dispatcher.on_mutation(id(1), Some(&props(1)), None);
        let late_change =
            dispatcher.on_mutation(id(1), Some(&props(1)), Some(&props(1).with_online(true)));
        dispatcher.on_mutation(id(1), None, Some(&props(1)));

        assert!(matches!(late_change, DispatchOutcome::Dropped(_)));
        assert_eq!(watcher.watch().await, Ok(Event::Removed(id(1))));
        assert_eq!(watcher.watch().await, Ok(Event::Added(props(1))));
    }

    #[test]
    fn absent_both_sides_is_unchanged() {
        let dispatcher = EventDispatcher::new(WatcherRegistry::new(), &Snapshot::new());
        assert_eq!(
            dispatcher.on_mutation(id(1), None, None),
            DispatchOutcome::Unchanged
        );
    }

    #[test]
    fn no_sessions_still_delivers() {
        let dispatcher = EventDispatcher::new(WatcherRegistry::new(), &Snapshot::new());
        assert_eq!(
            dispatcher.on_mutation(id(1), None, Some(&props(1))),
            DispatchOutcome::Delivered {
                event: "added",
                sessions: 0
            }
        );
    }
}
