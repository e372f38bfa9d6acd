//! Application execution logic.
//!
//! Runs an interface table with a set of observers attached, plays the
//! configured scenario against it, and persists the final state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use netif_watch::config::{OutputFormat, ValidatedConfig};
use netif_watch::monitor::{Event, SessionPhase, SnapshotMirror, Watcher};
use netif_watch::network::Snapshot;
use netif_watch::scenario::{self, Step};
use netif_watch::stack::InterfaceTable;
use netif_watch::state::{FileStateStore, LoadResult, StateError, StateStore};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Upper bound on waiting for observers to drain their queues before close.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed to install the shutdown signal handler.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    /// An observer task panicked or was aborted.
    #[error("Observer task failed: {0}")]
    Observer(#[source] tokio::task::JoinError),

    /// Failed to save state file.
    #[error("Failed to save state: {0}")]
    StateSave(#[source] StateError),
}

/// Runtime options extracted from validated config.
struct RuntimeOptions {
    watchers: usize,
    format: OutputFormat,
    once: bool,
    state_file: Option<PathBuf>,
}

impl From<&ValidatedConfig> for RuntimeOptions {
    fn from(config: &ValidatedConfig) -> Self {
        Self {
            watchers: config.watchers,
            format: config.format,
            once: config.once,
            state_file: config.state_file.clone(),
        }
    }
}

/// What one observer saw before its session closed.
#[derive(Debug)]
struct ObserverSummary {
    observer: usize,
    events: usize,
    snapshot: Snapshot,
}

/// Executes the application.
///
/// This function:
/// 1. Seeds the interface table from the state file (if configured)
/// 2. Attaches the configured number of observers
/// 3. Plays the scenario
/// 4. Waits for Ctrl+C, unless running with `--once`
/// 5. Closes every watcher and saves the final snapshot
///
/// # Errors
///
/// Returns an error if the signal handler cannot be installed, an observer
/// task fails, or the final state cannot be saved.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    let options = RuntimeOptions::from(&config);

    let state_store = options.state_file.as_ref().map(FileStateStore::new);
    let restored = match state_store {
        Some(ref store) => {
            tracing::info!("State persistence enabled: {}", store.path().display());
            restore_snapshot(store)
        }
        None => Snapshot::new(),
    };

    let table = Arc::new(InterfaceTable::from_snapshot(restored));
    let (watchers, observers) = spawn_observers(&table, options.watchers, options.format);

    play_scenario(&table, &config.steps).await;

    if options.once {
        wait_for_drain(&watchers, DRAIN_TIMEOUT).await;
    } else {
        tracing::info!("Scenario finished, press Ctrl+C to exit");
        shutdown_signal().await?;
        tracing::info!("Shutdown signal received, stopping...");
    }

    let final_snapshot = table.snapshot();
    table.close_all();
    drop(watchers);

    for observer in observers {
        let summary = observer.await.map_err(RunError::Observer)?;
        report_summary(&summary, &final_snapshot);
    }

    if let Some(ref store) = state_store {
        store
            .save(&final_snapshot)
            .await
            .map_err(RunError::StateSave)?;
        tracing::info!(interfaces = final_snapshot.len(), "State saved");
    }

    Ok(())
}

/// Loads the saved snapshot, degrading to an empty table on any problem.
fn restore_snapshot(store: &impl StateStore) -> Snapshot {
    match store.load() {
        LoadResult::Loaded(snapshot) => {
            tracing::info!(interfaces = snapshot.len(), "Restored previous state");
            snapshot
        }
        LoadResult::NotFound => {
            tracing::info!("No previous state found, starting fresh");
            Snapshot::new()
        }
        LoadResult::Corrupted { reason } => {
            tracing::warn!("State file corrupted ({reason}), will overwrite on next save");
            Snapshot::new()
        }
    }
}

/// Opens `count` sessions and spawns one observer task per session.
///
/// Returns the watchers alongside the tasks so the caller can inspect
/// session phases; dropping them does not close the sessions while the
/// observers still hold their clones.
fn spawn_observers(
    table: &InterfaceTable,
    count: usize,
    format: OutputFormat,
) -> (Vec<Watcher>, Vec<JoinHandle<ObserverSummary>>) {
    (1..=count)
        .map(|observer| {
            let watcher = table.watch();
            let task = tokio::spawn(observe(observer, watcher.clone(), format));
            (watcher, task)
        })
        .unzip()
}

/// Prints every event from `watcher` until its session closes.
async fn observe(observer: usize, watcher: Watcher, format: OutputFormat) -> ObserverSummary {
    let session_id = watcher.id();
    let mut mirror = SnapshotMirror::new();
    let mut events = 0;
    let mut stream = watcher.into_stream();

    tracing::debug!(observer, %session_id, "Observer attached");

    while let Some(event) = stream.next().await {
        emit_event(observer, &event, format);
        if let Err(e) = mirror.apply(event) {
            tracing::warn!(observer, "Event violates delivery order: {e}");
        }
        events += 1;
    }

    tracing::debug!(observer, events, "Observer detached");

    ObserverSummary {
        observer,
        events,
        snapshot: mirror.snapshot().clone(),
    }
}

async fn play_scenario(table: &InterfaceTable, steps: &[Step]) {
    if steps.is_empty() {
        tracing::info!("No scenario steps configured");
        return;
    }

    let applied = scenario::play(table, steps).await;
    tracing::info!(applied, total = steps.len(), "Scenario played");
}

/// Waits until no session has undelivered events, or `timeout` elapses.
async fn wait_for_drain(watchers: &[Watcher], timeout: Duration) {
    let drained = || {
        watchers
            .iter()
            .all(|w| matches!(w.phase(), SessionPhase::Blocked | SessionPhase::Closed))
    };

    let wait = async {
        while !drained() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    if tokio::time::timeout(timeout, wait).await.is_err() {
        tracing::warn!("Observers did not drain within {}ms", timeout.as_millis());
    }
}

fn emit_event(observer: usize, event: &Event, format: OutputFormat) {
    match format {
        OutputFormat::Text => tracing::info!(observer, "{event}"),
        OutputFormat::Json => match render_json(observer, event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(observer, "Failed to serialize event: {e}"),
        },
    }
}

/// One line of JSON output.
#[derive(Debug, Serialize)]
struct ObservedEvent<'a> {
    observer: usize,
    event: &'a Event,
}

fn render_json(observer: usize, event: &Event) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ObservedEvent { observer, event })
}

fn report_summary(summary: &ObserverSummary, expected: &Snapshot) {
    if summary.snapshot == *expected {
        tracing::info!(
            observer = summary.observer,
            events = summary.events,
            "Observer view matches final table"
        );
    } else {
        tracing::warn!(
            observer = summary.observer,
            events = summary.events,
            seen = summary.snapshot.len(),
            expected = expected.len(),
            "Observer view diverged from final table"
        );
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() -> Result<(), RunError> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RunError::Signal)?;

        tokio::select! {
            result = signal::ctrl_c() => result.map_err(RunError::Signal),
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RunError::Signal)
    }
}
