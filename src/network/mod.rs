//! Network data model for interface state.
//!
//! This module provides the types observers see:
//! - Interface identity and properties ([`InterfaceId`], [`InterfaceProperties`])
//! - Address assignments and their subnets ([`AddressAssignment`], [`Subnet`])
//! - Whole-table snapshots ([`Snapshot`])

mod address;
mod interface;

pub use address::{AddressAssignment, IpFamily, Subnet, SubnetError};
pub use interface::{InterfaceId, InterfaceProperties, Snapshot};
