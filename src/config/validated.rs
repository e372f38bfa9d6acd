//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::scenario::Step;

use super::cli::Cli;
use super::defaults;
use super::error::ConfigError;
use super::toml::TomlConfig;

/// How observers print the events they receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Number of observers to attach
    pub watchers: usize,

    /// Output format for observed events
    pub format: OutputFormat,

    /// Path to state file for restoring the table across restarts.
    /// If `None`, state persistence is disabled.
    pub state_file: Option<PathBuf>,

    /// Exit after the scenario instead of waiting for Ctrl+C
    pub once: bool,

    /// Scenario steps, in order
    pub steps: Vec<Step>,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_file_str = self
            .state_file
            .as_ref()
            .map_or_else(|| "none".to_string(), |p| p.display().to_string());

        write!(
            f,
            "Config {{ watchers: {}, format: {}, state_file: {}, once: {}, steps: {} }}",
            self.watchers,
            self.format,
            state_file_str,
            self.once,
            self.steps.len(),
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher count is out of range or the output
    /// format is unknown.
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let watchers = Self::resolve_watchers(cli, toml)?;
        let format = Self::resolve_format(cli, toml)?;
        let state_file = Self::resolve_state_file(cli, toml);

        // Flags only enable, they never disable a TOML `true`.
        let once = cli.once || toml.is_some_and(|t| t.run.once);

        let steps = toml.map(|t| t.steps.clone()).unwrap_or_default();

        Ok(Self {
            watchers,
            format,
            state_file,
            once,
            steps,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    fn resolve_watchers(cli: &Cli, toml: Option<&TomlConfig>) -> Result<usize, ConfigError> {
        // Priority: CLI explicit > TOML > default
        let value = cli
            .watchers
            .or_else(|| toml.and_then(|t| t.observers.count))
            .unwrap_or(defaults::WATCHERS);

        if value == 0 {
            return Err(ConfigError::InvalidWatchers {
                value,
                reason: "must be greater than 0",
            });
        }

        if value > defaults::MAX_WATCHERS {
            return Err(ConfigError::InvalidWatchers {
                value,
                reason: "exceeds the maximum of 1024",
            });
        }

        Ok(value)
    }

    fn resolve_format(cli: &Cli, toml: Option<&TomlConfig>) -> Result<OutputFormat, ConfigError> {
        if let Some(format) = cli.format {
            return Ok(format.into());
        }

        let value = toml
            .and_then(|t| t.observers.format.as_deref())
            .unwrap_or(defaults::FORMAT);

        parse_format(value)
    }

    fn resolve_state_file(cli: &Cli, toml: Option<&TomlConfig>) -> Option<PathBuf> {
        if let Some(ref path) = cli.state_file {
            return Some(path.clone());
        }

        toml.and_then(|t| t.state.file.as_ref().map(PathBuf::from))
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parse_format(s: &str) -> Result<OutputFormat, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "text" | "plain" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        _ => Err(ConfigError::InvalidFormat {
            value: s.to_string(),
        }),
    }
}
