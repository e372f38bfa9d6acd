//! Default values for configuration options.

/// Default number of observers.
pub const WATCHERS: usize = 2;

/// Upper bound on observers, to keep a typo from spawning thousands of tasks.
pub const MAX_WATCHERS: usize = 1024;

/// Default output format.
pub const FORMAT: &str = "text";
