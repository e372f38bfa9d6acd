//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// netif-watch: network interface watcher
///
/// Runs an in-memory interface table, attaches hanging-get observers to it,
/// and logs every event they receive while a scripted scenario mutates the
/// table.
#[derive(Debug, Parser)]
#[command(name = "netif-watch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Number of observers to attach
    #[arg(long, short = 'w')]
    pub watchers: Option<usize>,

    /// Output format for observed events
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Path to configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Path to state file for restoring the interface table across restarts
    #[arg(long = "state-file")]
    pub state_file: Option<PathBuf>,

    /// Exit after the scenario instead of waiting for Ctrl+C
    #[arg(long)]
    pub once: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Subcommands for netif-watch
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "netif-watch.toml")]
        output: PathBuf,
    },
}

/// Output format argument for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

impl From<FormatArg> for super::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }
}
