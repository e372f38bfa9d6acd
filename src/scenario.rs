//! Scripted mutations for driving an [`InterfaceTable`].
//!
//! A scenario is a list of [`Step`]s, each an [`Action`] applied after an
//! optional delay. Steps are read from the `[[step]]` array of the
//! configuration file:
//!
//! ```toml
//! [[step]]
//! action = "add_interface"
//!
//! [[step]]
//! delay_ms = 100
//! action = "add_address"
//! interface = 1
//! address = "192.168.0.1/16"
//! ```
//!
//! Keys that do not belong to the step's action are rejected.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::network::{InterfaceId, IpFamily, Subnet};
use crate::stack::{InterfaceTable, StackError};
use crate::time::Clock;

/// One scripted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum Action {
    /// Installs a new interface.
    AddInterface,
    /// Uninstalls an interface.
    RemoveInterface {
        /// Target interface.
        interface: InterfaceId,
    },
    /// Brings an interface up or down.
    SetOnline {
        /// Target interface.
        interface: InterfaceId,
        /// Desired state.
        online: bool,
    },
    /// Assigns an address.
    AddAddress {
        /// Target interface.
        interface: InterfaceId,
        /// The address, as `addr/prefix`.
        address: Subnet,
        /// Validity from now, in seconds. Absent means permanent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        valid_for_secs: Option<u64>,
    },
    /// Unassigns an address.
    RemoveAddress {
        /// Target interface.
        interface: InterfaceId,
        /// The address, as `addr/prefix`.
        address: Subnet,
    },
    /// Installs or removes a default route.
    SetDefaultRoute {
        /// Target interface.
        interface: InterfaceId,
        /// Route family.
        family: IpFamily,
        /// Whether the route is present.
        present: bool,
    },
    /// Reports a DHCP lease update.
    DhcpAcquired {
        /// Target interface.
        interface: InterfaceId,
        /// Previously leased address.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old: Option<Subnet>,
        /// Newly leased address; absent ends the lease.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new: Option<Subnet>,
        /// Lease length in seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lease_secs: Option<u64>,
        /// When the lease was granted, in seconds since the Unix epoch.
        /// Absent means now.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_at_secs: Option<u64>,
    },
}

impl Action {
    /// Returns the action's name as written in configuration.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddInterface => "add_interface",
            Self::RemoveInterface { .. } => "remove_interface",
            Self::SetOnline { .. } => "set_online",
            Self::AddAddress { .. } => "add_address",
            Self::RemoveAddress { .. } => "remove_address",
            Self::SetDefaultRoute { .. } => "set_default_route",
            Self::DhcpAcquired { .. } => "dhcp_acquired",
        }
    }

    /// Performs the action on `table`.
    ///
    /// # Errors
    ///
    /// Returns the [`StackError`] reported by the table.
    pub fn apply<C: Clock>(&self, table: &InterfaceTable<C>) -> Result<(), StackError> {
        match *self {
            Self::AddInterface => {
                table.add_interface()?;
            }
            Self::RemoveInterface { interface } => {
                table.remove_interface(interface)?;
            }
            Self::SetOnline { interface, online } => {
                table.set_online(interface, online)?;
            }
            Self::AddAddress {
                interface,
                address,
                valid_for_secs,
            } => {
                let valid_until = valid_for_secs
                    .map(|secs| table.lease_expiry(interface, Duration::from_secs(secs)))
                    .transpose()?;
                table.add_address(interface, address, valid_until)?;
            }
            Self::RemoveAddress { interface, address } => {
                table.remove_address(interface, address)?;
            }
            Self::SetDefaultRoute {
                interface,
                family,
                present,
            } => {
                table.set_default_route(interface, family, present)?;
            }
            Self::DhcpAcquired {
                interface,
                old,
                new,
                lease_secs,
                updated_at_secs,
            } => {
                let lease = lease_secs.map(Duration::from_secs);
                match updated_at_secs {
                    Some(secs) => {
                        let updated_at = SystemTime::UNIX_EPOCH
                            .checked_add(Duration::from_secs(secs))
                            .ok_or(StackError::LeaseOutOfRange(interface))?;
                        table.dhcp_acquired_at(interface, old, new, lease, updated_at)?;
                    }
                    None => {
                        table.dhcp_acquired(interface, old, new, lease)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// An [`Action`] preceded by a delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStep")]
pub struct Step {
    /// Milliseconds to wait before applying the action.
    #[serde(default)]
    pub delay_ms: u64,
    /// The mutation to apply.
    #[serde(flatten)]
    pub action: Action,
}

/// A step as written, before its action is checked.
///
/// `deny_unknown_fields` has no effect through `flatten`, so the action's
/// keys are collected into a table and deserialized strictly on their own.
#[derive(Deserialize)]
struct RawStep {
    #[serde(default)]
    delay_ms: u64,
    #[serde(flatten)]
    action: toml::Table,
}

impl TryFrom<RawStep> for Step {
    type Error = toml::de::Error;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let action = toml::Value::Table(raw.action).try_into()?;
        Ok(Self {
            delay_ms: raw.delay_ms,
            action,
        })
    }
}

impl Step {
    /// Creates a step with no delay.
    #[must_use]
    pub const fn now(action: Action) -> Self {
        Self {
            delay_ms: 0,
            action,
        }
    }

    /// Returns the delay as a [`Duration`].
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Plays `steps` against `table` in order.
///
/// A failing step is logged and skipped. Returns the number of steps that
/// applied successfully.
pub async fn play<C: Clock>(table: &InterfaceTable<C>, steps: &[Step]) -> usize {
    let mut applied = 0;

    for (index, step) in steps.iter().enumerate() {
        if step.delay_ms > 0 {
            tokio::time::sleep(step.delay()).await;
        }

        match step.action.apply(table) {
            Ok(()) => {
                debug!(step = index, action = step.action.name(), "Step applied");
                applied += 1;
            }
            Err(e) => {
                warn!(step = index, action = step.action.name(), "Step failed: {e}");
            }
        }
    }

    applied
}
