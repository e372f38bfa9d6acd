//! Reference owning stack for watcher sessions.
//!
//! [`InterfaceTable`] holds the authoritative interface properties and
//! notifies watchers of every committed mutation.

mod error;
mod table;

pub use error::StackError;
pub use table::InterfaceTable;
