//! Address types: subnets and their assignments to interfaces.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// IP address family.
///
/// Selects which default-route flag a route mutation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    /// IPv4.
    #[serde(alias = "ipv4")]
    V4,
    /// IPv6.
    #[serde(alias = "ipv6")]
    V6,
}

impl IpFamily {
    /// Returns the maximum prefix length for this family.
    #[must_use]
    pub const fn max_prefix_len(self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }

    /// Returns the family of the given address.
    #[must_use]
    pub const fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// Error returned when a subnet is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubnetError {
    /// The textual form is not `addr/prefix`.
    #[error("Invalid subnet '{0}': expected 'addr/prefix'")]
    Format(String),

    /// The address part failed to parse.
    #[error("Invalid address '{0}'")]
    Address(String),

    /// The prefix length exceeds the family maximum.
    #[error("Prefix length {prefix_len} exceeds {max} for {family}")]
    PrefixTooLong {
        /// The rejected prefix length.
        prefix_len: u8,
        /// The maximum allowed for the family.
        max: u8,
        /// The address family.
        family: IpFamily,
    },
}

/// An IP address paired with a prefix length, e.g. `192.168.0.1/16`.
///
/// The host bits are preserved: `192.168.0.1/16` and `192.168.0.2/16`
/// are distinct subnets because they denote distinct assigned addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Subnet {
    addr: IpAddr,
    prefix_len: u8,
}

impl Subnet {
    /// Creates a subnet, validating the prefix length against the family.
    ///
    /// # Errors
    ///
    /// Returns [`SubnetError::PrefixTooLong`] if `prefix_len` exceeds 32 for
    /// IPv4 or 128 for IPv6.
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, SubnetError> {
        let family = IpFamily::of(&addr);
        let max = family.max_prefix_len();
        if prefix_len > max {
            return Err(SubnetError::PrefixTooLong {
                prefix_len,
                max,
                family,
            });
        }
        Ok(Self { addr, prefix_len })
    }

    /// Returns the address.
    #[must_use]
    pub const fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Returns the prefix length.
    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns the address family.
    #[must_use]
    pub const fn family(&self) -> IpFamily {
        IpFamily::of(&self.addr)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for Subnet {
    type Err = SubnetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| SubnetError::Format(s.to_string()))?;
        let addr = addr
            .parse::<IpAddr>()
            .map_err(|_| SubnetError::Address(addr.to_string()))?;
        let prefix_len = prefix
            .parse::<u8>()
            .map_err(|_| SubnetError::Format(s.to_string()))?;
        Self::new(addr, prefix_len)
    }
}

impl TryFrom<String> for Subnet {
    type Error = SubnetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Subnet> for String {
    fn from(subnet: Subnet) -> Self {
        subnet.to_string()
    }
}

/// An address assigned to an interface, with an optional expiry.
///
/// Two assignments are equal iff both the subnet and the expiry match, so a
/// lease renewal that moves `valid_until` is an observable change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddressAssignment {
    /// The assigned address and prefix.
    pub subnet: Subnet,
    /// When the assignment expires, if it is leased.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<SystemTime>,
}

impl AddressAssignment {
    /// Creates an assignment that never expires.
    #[must_use]
    pub const fn permanent(subnet: Subnet) -> Self {
        Self {
            subnet,
            valid_until: None,
        }
    }

    /// Creates an assignment valid until the given instant.
    #[must_use]
    pub const fn leased(subnet: Subnet, valid_until: SystemTime) -> Self {
        Self {
            subnet,
            valid_until: Some(valid_until),
        }
    }
}

impl fmt::Display for AddressAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subnet)?;
        if let Some(until) = self.valid_until {
            let secs = until
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            write!(f, " (until {secs})")?;
        }
        Ok(())
    }
}
