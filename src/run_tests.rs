//! Tests for the run module.

use super::*;
use netif_watch::config::Cli;
use netif_watch::network::{InterfaceId, InterfaceProperties};
use netif_watch::scenario::Action;

fn config(args: &[&str]) -> ValidatedConfig {
    let mut full_args = vec!["netif-watch"];
    full_args.extend(args);
    ValidatedConfig::from_raw(&Cli::parse_from_iter(full_args), None).unwrap()
}

mod run_error {
    use super::*;

    #[test]
    fn signal_displays_source() {
        let error = RunError::Signal(std::io::Error::other("no handler"));
        assert_eq!(
            error.to_string(),
            "Failed to install signal handler: no handler"
        );
    }

    #[test]
    fn debug_format_works() {
        let error = RunError::Signal(std::io::Error::other("x"));
        assert!(format!("{error:?}").contains("Signal"));
    }
}

mod runtime_options {
    use super::*;

    #[test]
    fn from_config_extracts_fields() {
        let config = config(&[
            "--watchers",
            "4",
            "--format",
            "json",
            "--once",
            "--state-file",
            "s.json",
        ]);
        let options = RuntimeOptions::from(&config);

        assert_eq!(options.watchers, 4);
        assert_eq!(options.format, OutputFormat::Json);
        assert!(options.once);
        assert_eq!(options.state_file, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn defaults_when_not_specified() {
        let options = RuntimeOptions::from(&config(&[]));

        assert_eq!(options.watchers, 2);
        assert_eq!(options.format, OutputFormat::Text);
        assert!(!options.once);
        assert!(options.state_file.is_none());
    }
}

mod restore {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));

        assert!(restore_snapshot(&store).is_empty());
    }

    #[test]
    fn corrupted_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{").unwrap();

        assert!(restore_snapshot(&FileStateStore::new(&path)).is_empty());
    }

    #[tokio::test]
    async fn saved_snapshot_is_restored() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));
        let id = InterfaceId::new(5);
        let snapshot = Snapshot::from([(id, InterfaceProperties::new(id).with_online(true))]);
        store.save(&snapshot).await.unwrap();

        assert_eq!(restore_snapshot(&store), snapshot);
    }
}

mod render {
    use super::*;

    #[test]
    fn json_line_carries_observer_and_event() {
        let line = render_json(3, &Event::Removed(InterfaceId::new(9))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["observer"], 3);
        assert_eq!(value["event"]["removed"], 9);
    }

    #[test]
    fn json_line_is_single_line() {
        let id = InterfaceId::new(1);
        let line = render_json(1, &Event::Added(InterfaceProperties::new(id))).unwrap();

        assert!(!line.contains('\n'));
    }
}

mod observers {
    use super::*;

    #[tokio::test]
    async fn observers_mirror_the_table() {
        let table = InterfaceTable::new();
        let (watchers, observers) = spawn_observers(&table, 3, OutputFormat::Text);
        assert_eq!(table.watcher_count(), 3);

        let steps = vec![
            Step::now(Action::AddInterface),
            Step::now(Action::SetOnline {
                interface: InterfaceId::new(1),
                online: true,
            }),
            Step::now(Action::AddInterface),
        ];
        play_scenario(&table, &steps).await;
        wait_for_drain(&watchers, Duration::from_secs(2)).await;

        let expected = table.snapshot();
        table.close_all();
        drop(watchers);

        for observer in observers {
            let summary = observer.await.unwrap();
            assert_eq!(summary.snapshot, expected);
            // idle + three mutations
            assert_eq!(summary.events, 4);
        }
    }

    #[tokio::test]
    async fn drain_returns_when_all_blocked() {
        let table = InterfaceTable::new();
        let (watchers, observers) = spawn_observers(&table, 1, OutputFormat::Json);

        wait_for_drain(&watchers, Duration::from_secs(2)).await;
        assert_eq!(watchers[0].phase(), SessionPhase::Blocked);

        table.close_all();
        for observer in observers {
            assert_eq!(observer.await.unwrap().events, 1);
        }
    }
}
