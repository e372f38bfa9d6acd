//! Core interface types: identifiers, properties and snapshots.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::address::{AddressAssignment, IpFamily};

/// Stable identifier of one network interface.
///
/// Never reused while the interface exists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct InterfaceId(u64);

impl InterfaceId {
    /// Creates an interface id from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for InterfaceId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One interface's full observable state at an instant.
///
/// # Equality
///
/// Addresses are held in an ordered set, so equality is set equality:
/// insertion order never matters and duplicates cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceProperties {
    /// The interface this describes.
    pub id: InterfaceId,
    /// Whether the interface is administratively and operationally up.
    pub online: bool,
    /// All addresses currently assigned.
    #[serde(default)]
    pub addresses: BTreeSet<AddressAssignment>,
    /// Whether a default IPv4 route through this interface exists.
    #[serde(default)]
    pub has_default_ipv4_route: bool,
    /// Whether a default IPv6 route through this interface exists.
    #[serde(default)]
    pub has_default_ipv6_route: bool,
}

impl InterfaceProperties {
    /// Creates properties for a freshly added interface: offline, no
    /// addresses and no default routes.
    #[must_use]
    pub const fn new(id: InterfaceId) -> Self {
        Self {
            id,
            online: false,
            addresses: BTreeSet::new(),
            has_default_ipv4_route: false,
            has_default_ipv6_route: false,
        }
    }

    /// Sets the online flag, builder style.
    #[must_use]
    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Adds an address, builder style.
    #[must_use]
    pub fn with_address(mut self, address: AddressAssignment) -> Self {
        self.addresses.insert(address);
        self
    }

    /// Sets a default-route flag, builder style.
    #[must_use]
    pub fn with_default_route(mut self, family: IpFamily, present: bool) -> Self {
        *self.default_route_mut(family) = present;
        self
    }

    /// Returns whether a default route exists for the given family.
    #[must_use]
    pub const fn has_default_route(&self, family: IpFamily) -> bool {
        match family {
            IpFamily::V4 => self.has_default_ipv4_route,
            IpFamily::V6 => self.has_default_ipv6_route,
        }
    }

    /// Returns a mutable reference to the default-route flag for a family.
    pub fn default_route_mut(&mut self, family: IpFamily) -> &mut bool {
        match family {
            IpFamily::V4 => &mut self.has_default_ipv4_route,
            IpFamily::V6 => &mut self.has_default_ipv6_route,
        }
    }
}

impl fmt::Display for InterfaceProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} online={} v4_default={} v6_default={} addresses=[",
            self.id, self.online, self.has_default_ipv4_route, self.has_default_ipv6_route
        )?;
        for (i, address) in self.addresses.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{address}")?;
        }
        write!(f, "]")
    }
}

/// Current properties of every interface, keyed and ordered by id.
pub type Snapshot = BTreeMap<InterfaceId, InterfaceProperties>;
