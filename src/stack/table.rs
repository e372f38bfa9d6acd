//! In-memory interface table with watcher notification.

use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::error::StackError;
use crate::monitor::{DispatchOutcome, EventDispatcher, Watcher, WatcherRegistry};
use crate::network::{
    AddressAssignment, InterfaceId, InterfaceProperties, IpFamily, Snapshot, Subnet,
};
use crate::time::{Clock, SystemClock};

#[derive(Debug)]
struct TableState {
    interfaces: Snapshot,
    /// `None` once `u64::MAX` has been assigned. Ids are never reused.
    next_id: Option<u64>,
}

/// The owning store of interface properties.
///
/// Every mutation takes the table lock, commits, and reports the change to
/// the [`EventDispatcher`] before releasing it. Watchers therefore observe
/// mutations in commit order, and a session opened with [`watch`](Self::watch)
/// sees exactly the mutations committed after its replay.
///
/// Mutations return the [`DispatchOutcome`] so callers can tell whether the
/// change was observable.
#[derive(Debug)]
pub struct InterfaceTable<C: Clock = SystemClock> {
    state: Mutex<TableState>,
    dispatcher: EventDispatcher,
    clock: C,
}

impl InterfaceTable<SystemClock> {
    /// Creates an empty table using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates a table seeded from persisted state.
    ///
    /// Ids assigned by [`add_interface`](Self::add_interface) continue after
    /// the highest restored id. Restoring `u64::MAX` leaves no ids to assign.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::from_snapshot_with_clock(snapshot, SystemClock)
    }
}

impl Default for InterfaceTable<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InterfaceTable<C> {
    /// Creates an empty table reading lease times from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self::from_snapshot_with_clock(Snapshot::new(), clock)
    }

    /// Creates a table seeded from `snapshot`, reading lease times from `clock`.
    pub fn from_snapshot_with_clock(snapshot: Snapshot, clock: C) -> Self {
        let next_id = snapshot
            .keys()
            .next_back()
            .map_or(Some(1), |id| id.get().checked_add(1));
        if next_id.is_none() {
            warn!("Restored interface ids leave none to assign");
        }
        let dispatcher = EventDispatcher::new(WatcherRegistry::new(), &snapshot);

        if !snapshot.is_empty() {
            info!(interfaces = snapshot.len(), "Interface table restored");
        }

        Self {
            state: Mutex::new(TableState {
                interfaces: snapshot,
                next_id,
            }),
            dispatcher,
            clock,
        }
    }

    /// Returns the clock used for lease expiry.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns a copy of the current interface properties.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().interfaces.clone()
    }

    /// Opens a watcher session.
    ///
    /// The session's replay reflects the table at the moment of the call and
    /// every later mutation is delivered to it exactly once.
    #[must_use]
    pub fn watch(&self) -> Watcher {
        let state = self.state.lock();
        self.dispatcher.registry().open_session(&state.interfaces)
    }

    /// Returns the registry of open watcher sessions.
    #[must_use]
    pub const fn registry(&self) -> &WatcherRegistry {
        self.dispatcher.registry()
    }

    /// Returns the number of open watcher sessions.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.registry().len()
    }

    /// Closes every open watcher session.
    pub fn close_all(&self) {
        self.registry().close_all();
    }

    /// Returns the instant `lease` after the clock's current time.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::LeaseOutOfRange`] if the expiry is not
    /// representable.
    pub fn lease_expiry(
        &self,
        id: InterfaceId,
        lease: Duration,
    ) -> Result<SystemTime, StackError> {
        expiry(id, self.clock.now(), lease)
    }

    /// Installs a new interface: offline, no addresses and no default routes.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::IdsExhausted`] once every id has been assigned.
    pub fn add_interface(&self) -> Result<InterfaceId, StackError> {
        let mut state = self.state.lock();
        let raw = state.next_id.ok_or(StackError::IdsExhausted)?;
        let id = InterfaceId::new(raw);
        state.next_id = raw.checked_add(1);

        let props = InterfaceProperties::new(id);
        state.interfaces.insert(id, props.clone());
        self.dispatcher.on_mutation(id, None, Some(&props));

        debug!(interface_id = %id, "Interface added");
        Ok(id)
    }

    /// Uninstalls an interface.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotFound`] if `id` is not installed.
    pub fn remove_interface(&self, id: InterfaceId) -> Result<DispatchOutcome, StackError> {
        let mut state = self.state.lock();
        let before = state
            .interfaces
            .remove(&id)
            .ok_or(StackError::NotFound(id))?;

        debug!(interface_id = %id, "Interface removed");
        Ok(self.dispatcher.on_mutation(id, Some(&before), None))
    }

    /// Brings an interface up or down.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotFound`] if `id` is not installed.
    pub fn set_online(&self, id: InterfaceId, online: bool) -> Result<DispatchOutcome, StackError> {
        self.mutate(id, |props| {
            props.online = online;
            Ok(())
        })
    }

    /// Assigns an address, optionally valid only until `valid_until`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotFound`] for an unknown interface and
    /// [`StackError::AddressExists`] if `subnet` is already assigned.
    pub fn add_address(
        &self,
        id: InterfaceId,
        subnet: Subnet,
        valid_until: Option<SystemTime>,
    ) -> Result<DispatchOutcome, StackError> {
        self.mutate(id, |props| {
            if find_address(props, subnet).is_some() {
                return Err(StackError::AddressExists { id, subnet });
            }
            props.addresses.insert(AddressAssignment {
                subnet,
                valid_until,
            });
            Ok(())
        })
    }

    /// Unassigns an address.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotFound`] for an unknown interface and
    /// [`StackError::AddressNotFound`] if `subnet` is not assigned.
    pub fn remove_address(
        &self,
        id: InterfaceId,
        subnet: Subnet,
    ) -> Result<DispatchOutcome, StackError> {
        self.mutate(id, |props| {
            let existing =
                find_address(props, subnet).ok_or(StackError::AddressNotFound { id, subnet })?;
            props.addresses.remove(&existing);
            Ok(())
        })
    }

    /// Installs or removes the default route of `family` through an interface.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotFound`] if `id` is not installed.
    pub fn set_default_route(
        &self,
        id: InterfaceId,
        family: IpFamily,
        present: bool,
    ) -> Result<DispatchOutcome, StackError> {
        self.mutate(id, |props| {
            *props.default_route_mut(family) = present;
            Ok(())
        })
    }

    /// Applies a DHCP lease update that was granted now.
    ///
    /// See [`dhcp_acquired_at`](Self::dhcp_acquired_at).
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotFound`] if `id` is not installed and
    /// [`StackError::LeaseOutOfRange`] if the expiry is not representable.
    pub fn dhcp_acquired(
        &self,
        id: InterfaceId,
        old: Option<Subnet>,
        new: Option<Subnet>,
        lease: Option<Duration>,
    ) -> Result<DispatchOutcome, StackError> {
        self.dhcp_acquired_at(id, old, new, lease, self.clock.now())
    }

    /// Applies a DHCP lease update as a single mutation.
    ///
    /// `old` is the previously leased address, if any, and is removed. `new`
    /// is the newly acquired address and is assigned with an expiry of
    /// `updated_at + lease`; `None` signals the end of the lease. Renewing the
    /// same address with an unchanged expiry produces no event.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::NotFound`] if `id` is not installed and
    /// [`StackError::LeaseOutOfRange`] if the expiry is not representable.
    pub fn dhcp_acquired_at(
        &self,
        id: InterfaceId,
        old: Option<Subnet>,
        new: Option<Subnet>,
        lease: Option<Duration>,
        updated_at: SystemTime,
    ) -> Result<DispatchOutcome, StackError> {
        let valid_until = lease
            .map(|lease| expiry(id, updated_at, lease))
            .transpose()?;

        self.mutate(id, |props| {
            if let Some(old) = old {
                match find_address(props, old) {
                    Some(existing) => {
                        props.addresses.remove(&existing);
                    }
                    None => {
                        warn!(interface_id = %id, address = %old, "Previous DHCP address not assigned");
                    }
                }
            }
            if let Some(new) = new {
                if let Some(existing) = find_address(props, new) {
                    props.addresses.remove(&existing);
                }
                props.addresses.insert(AddressAssignment {
                    subnet: new,
                    valid_until,
                });
            }
            Ok(())
        })
    }

    /// Applies `change` to a copy of interface `id` and commits it if the
    /// closure succeeds. The dispatcher is notified under the table lock.
    fn mutate<F>(&self, id: InterfaceId, change: F) -> Result<DispatchOutcome, StackError>
    where
        F: FnOnce(&mut InterfaceProperties) -> Result<(), StackError>,
    {
        let mut state = self.state.lock();
        let current = state
            .interfaces
            .get_mut(&id)
            .ok_or(StackError::NotFound(id))?;

        let before = current.clone();
        let mut after = before.clone();
        change(&mut after)?;
        *current = after.clone();

        Ok(self.dispatcher.on_mutation(id, Some(&before), Some(&after)))
    }
}

fn expiry(
    id: InterfaceId,
    start: SystemTime,
    lease: Duration,
) -> Result<SystemTime, StackError> {
    start
        .checked_add(lease)
        .ok_or(StackError::LeaseOutOfRange(id))
}

fn find_address(props: &InterfaceProperties, subnet: Subnet) -> Option<AddressAssignment> {
    props
        .addresses
        .iter()
        .find(|assignment| assignment.subnet == subnet)
        .copied()
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
