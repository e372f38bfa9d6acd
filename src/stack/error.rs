use thiserror::Error;

use crate::network::{InterfaceId, Subnet};

/// Errors returned by [`InterfaceTable`](super::InterfaceTable) mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// No interface with this id is installed.
    #[error("Interface {0} not found")]
    NotFound(InterfaceId),

    /// The interface already has this address assigned.
    #[error("Address {subnet} already assigned to interface {id}")]
    AddressExists {
        /// The interface that was mutated.
        id: InterfaceId,
        /// The duplicate address.
        subnet: Subnet,
    },

    /// The interface does not have this address assigned.
    #[error("Address {subnet} not assigned to interface {id}")]
    AddressNotFound {
        /// The interface that was mutated.
        id: InterfaceId,
        /// The missing address.
        subnet: Subnet,
    },

    /// A lease expiry falls outside the range of [`SystemTime`](std::time::SystemTime).
    #[error("Lease expiry on interface {0} is out of range")]
    LeaseOutOfRange(InterfaceId),

    /// Every interface id has been handed out.
    #[error("No interface ids left to assign")]
    IdsExhausted,
}
