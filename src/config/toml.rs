//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;
use crate::scenario::Step;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Observer configuration
    #[serde(default)]
    pub observers: ObserversSection,

    /// State persistence configuration
    #[serde(default)]
    pub state: StateSection,

    /// Run mode configuration
    #[serde(default)]
    pub run: RunSection,

    /// Scenario steps, in order
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// Observer configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObserversSection {
    /// Number of observers to attach
    pub count: Option<usize>,

    /// Output format: "text" or "json"
    pub format: Option<String>,
}

/// State persistence section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSection {
    /// Path of the state file
    pub file: Option<String>,
}

/// Run mode section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Exit after the scenario instead of waiting for Ctrl+C
    #[serde(default)]
    pub once: bool,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# netif-watch Configuration File

[observers]
# Number of observers attached to the interface table (default: 2)
count = 2

# Output format for observed events: "text" or "json" (default: text)
# format = "text"

[state]
# Restore the interface table from this file on start and save it on exit
# file = "netif-watch-state.json"

[run]
# Exit once the scenario has played instead of waiting for Ctrl+C
# once = false

# Scenario steps, applied in order. Each step may wait `delay_ms` first.
# Interface ids are assigned from 1 (or after the highest restored id).
# A key the action does not take is a configuration error.

[[step]]
action = "add_interface"

[[step]]
delay_ms = 100
action = "set_online"
interface = 1
online = true

[[step]]
delay_ms = 100
action = "add_address"
interface = 1
address = "192.168.0.1/16"

[[step]]
delay_ms = 100
action = "set_default_route"
interface = 1
family = "ipv4"
present = true

[[step]]
delay_ms = 100
action = "dhcp_acquired"
interface = 1
new = "192.168.0.4/24"
lease_secs = 3600

# Other actions: remove_interface, remove_address,
# and dhcp_acquired with `old` set and `new` omitted to end a lease.
# dhcp_acquired also takes `updated_at_secs` (Unix seconds) to date the lease
# from a fixed instant instead of now.
"#
    .to_string()
}
