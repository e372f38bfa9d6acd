//! netif-watch: hanging-get watchers over a network interface table
//!
//! A library for observing network interface state: each observer opens a
//! session, receives a replay of the current interfaces followed by an idle
//! marker, then one event per committed change.

pub mod config;
pub mod monitor;
pub mod network;
pub mod scenario;
pub mod stack;
pub mod state;
pub mod time;
