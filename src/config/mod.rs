//! Configuration layer for netif-watch.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! The `--once` flag uses OR semantics: once set `true` in TOML, the CLI
//! cannot turn it off.
//!
//! Scenario steps (`[[step]]`) are TOML-only.

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command, FormatArg};
pub use error::ConfigError;
pub use toml::{TomlConfig, default_config_template};
pub use validated::{OutputFormat, ValidatedConfig, write_default_config};
