//! Interface change detection: property diffs and watcher events.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::network::{AddressAssignment, InterfaceId, InterfaceProperties};

/// The fields of one interface that changed between two snapshots.
///
/// Every field except `id` is optional; `None` means "unchanged". A diff
/// with only `id` set is empty and is never delivered to watchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertiesDiff {
    /// The interface the diff applies to.
    pub id: InterfaceId,
    /// New online state, if it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    /// The complete new address set, if any address changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<BTreeSet<AddressAssignment>>,
    /// New default IPv4 route presence, if it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_default_ipv4_route: Option<bool>,
    /// New default IPv6 route presence, if it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_default_ipv6_route: Option<bool>,
}

impl PropertiesDiff {
    /// Creates an empty diff for the given interface.
    #[must_use]
    pub const fn empty(id: InterfaceId) -> Self {
        Self {
            id,
            online: None,
            addresses: None,
            has_default_ipv4_route: None,
            has_default_ipv6_route: None,
        }
    }

    /// Returns true if no field besides `id` is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.online.is_none()
            && self.addresses.is_none()
            && self.has_default_ipv4_route.is_none()
            && self.has_default_ipv6_route.is_none()
    }

    /// Applies this diff to `properties`, overwriting every set field.
    ///
    /// The caller is responsible for matching ids.
    pub fn apply_to(&self, properties: &mut InterfaceProperties) {
        if let Some(online) = self.online {
            properties.online = online;
        }
        if let Some(addresses) = &self.addresses {
            properties.addresses.clone_from(addresses);
        }
        if let Some(v4) = self.has_default_ipv4_route {
            properties.has_default_ipv4_route = v4;
        }
        if let Some(v6) = self.has_default_ipv6_route {
            properties.has_default_ipv6_route = v6;
        }
    }
}

impl fmt::Display for PropertiesDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={}", self.id)?;
        if let Some(online) = self.online {
            write!(f, " online={online}")?;
        }
        if let Some(v4) = self.has_default_ipv4_route {
            write!(f, " v4_default={v4}")?;
        }
        if let Some(v6) = self.has_default_ipv6_route {
            write!(f, " v6_default={v6}")?;
        }
        if let Some(addresses) = &self.addresses {
            write!(f, " addresses=[")?;
            for (i, address) in addresses.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{address}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Computes the fields that differ between two snapshots of one interface.
///
/// This is a pure function: scalar fields are compared by value, addresses
/// by set equality including expiry. Any address change carries the
/// **entire** new address set rather than a per-element delta.
///
/// # Returns
///
/// `None` when nothing differs. Callers must not synthesize an event in
/// that case.
///
/// The returned diff takes its id from `after`.
#[must_use]
pub fn compute_diff(
    before: &InterfaceProperties,
    after: &InterfaceProperties,
) -> Option<PropertiesDiff> {
    let mut diff = PropertiesDiff::empty(after.id);

    if before.online != after.online {
        diff.online = Some(after.online);
    }
    if before.addresses != after.addresses {
        diff.addresses = Some(after.addresses.clone());
    }
    if before.has_default_ipv4_route != after.has_default_ipv4_route {
        diff.has_default_ipv4_route = Some(after.has_default_ipv4_route);
    }
    if before.has_default_ipv6_route != after.has_default_ipv6_route {
        diff.has_default_ipv6_route = Some(after.has_default_ipv6_route);
    }

    (!diff.is_empty()).then_some(diff)
}

/// An event delivered to a watcher.
///
/// A session always starts with one [`Event::Existing`] per interface present
/// at open time, followed by exactly one [`Event::Idle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// An interface that existed when the session was opened.
    Existing(InterfaceProperties),
    /// End of the initial replay.
    Idle,
    /// An interface appeared.
    Added(InterfaceProperties),
    /// Some properties of a known interface changed.
    Changed(PropertiesDiff),
    /// An interface disappeared.
    Removed(InterfaceId),
}

impl Event {
    /// Returns the interface this event concerns, or `None` for [`Event::Idle`].
    #[must_use]
    pub const fn interface_id(&self) -> Option<InterfaceId> {
        match self {
            Self::Existing(props) | Self::Added(props) => Some(props.id),
            Self::Changed(diff) => Some(diff.id),
            Self::Removed(id) => Some(*id),
            Self::Idle => None,
        }
    }

    /// Returns a short label for logging.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Existing(_) => "existing",
            Self::Idle => "idle",
            Self::Added(_) => "added",
            Self::Changed(_) => "changed",
            Self::Removed(_) => "removed",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing(props) => write!(f, "existing {props}"),
            Self::Idle => write!(f, "idle"),
            Self::Added(props) => write!(f, "added {props}"),
            Self::Changed(diff) => write!(f, "changed {diff}"),
            Self::Removed(id) => write!(f, "removed id={id}"),
        }
    }
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
