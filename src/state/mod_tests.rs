//! Tests for state persistence module.

use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use crate::network::{AddressAssignment, InterfaceId, InterfaceProperties, IpFamily, Snapshot};
use crate::state::{FileStateStore, LoadResult, StateStore};

fn interface(raw: u64, address: &str) -> InterfaceProperties {
    InterfaceProperties::new(InterfaceId::new(raw))
        .with_online(true)
        .with_address(AddressAssignment::permanent(address.parse().unwrap()))
}

fn snapshot_of(interfaces: Vec<InterfaceProperties>) -> Snapshot {
    interfaces.into_iter().map(|p| (p.id, p)).collect()
}

mod load_result {
    use super::*;

    #[test]
    fn into_snapshot_returns_loaded_data() {
        let snapshot = snapshot_of(vec![interface(1, "192.168.1.1/24")]);
        let result = LoadResult::Loaded(snapshot.clone());

        assert_eq!(result.into_snapshot(), snapshot);
    }

    #[test]
    fn into_snapshot_returns_empty_for_not_found() {
        assert!(LoadResult::NotFound.into_snapshot().is_empty());
    }

    #[test]
    fn into_snapshot_returns_empty_for_corrupted() {
        let result = LoadResult::Corrupted {
            reason: "test".to_string(),
        };
        assert!(result.into_snapshot().is_empty());
    }

    #[test]
    fn is_loaded_only_for_loaded() {
        assert!(LoadResult::Loaded(Snapshot::new()).is_loaded());
        assert!(!LoadResult::NotFound.is_loaded());
        assert!(
            !LoadResult::Corrupted {
                reason: "test".to_string()
            }
            .is_loaded()
        );
    }
}

mod file_state_store {
    use super::*;

    #[test]
    fn load_returns_not_found_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("nonexistent.json"));

        assert!(matches!(store.load(), LoadResult::NotFound));
    }

    #[test]
    fn load_returns_corrupted_for_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not valid json {{{").unwrap();

        match FileStateStore::new(&path).load() {
            LoadResult::Corrupted { reason } => assert!(reason.contains("Invalid JSON")),
            other => panic!("Expected Corrupted, got {other:?}"),
        }
    }

    #[test]
    fn load_returns_corrupted_for_incompatible_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"version": 999, "interfaces": []}"#).unwrap();

        match FileStateStore::new(&path).load() {
            LoadResult::Corrupted { reason } => {
                assert!(reason.contains("Incompatible version"));
                assert!(reason.contains("999"));
            }
            other => panic!("Expected Corrupted, got {other:?}"),
        }
    }

    #[test]
    fn load_returns_corrupted_for_highest_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let props =
            serde_json::to_value(InterfaceProperties::new(InterfaceId::new(u64::MAX))).unwrap();
        let content = serde_json::json!({"version": 1, "interfaces": [props]});
        std::fs::write(&path, content.to_string()).unwrap();

        match FileStateStore::new(&path).load() {
            LoadResult::Corrupted { reason } => {
                assert!(reason.contains("18446744073709551615"), "reason: {reason}");
            }
            other => panic!("Expected Corrupted, got {other:?}"),
        }
    }

    #[test]
    fn load_returns_corrupted_for_duplicate_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let props = serde_json::to_value(InterfaceProperties::new(InterfaceId::new(4))).unwrap();
        let content = serde_json::json!({"version": 1, "interfaces": [props, props]});
        std::fs::write(&path, content.to_string()).unwrap();

        match FileStateStore::new(&path).load() {
            LoadResult::Corrupted { reason } => assert!(reason.contains("Duplicate")),
            other => panic!("Expected Corrupted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStateStore::new(&path);

        let leased = AddressAssignment::leased(
            "fe80::1/64".parse().unwrap(),
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        );
        let snapshot = snapshot_of(vec![
            interface(1, "192.168.1.1/24"),
            interface(2, "10.0.0.1/8")
                .with_address(leased)
                .with_default_route(IpFamily::V6, true),
        ]);

        store.save(&snapshot).await.unwrap();
        assert!(path.exists());

        match store.load() {
            LoadResult::Loaded(loaded) => assert_eq!(loaded, snapshot),
            other => panic!("Expected Loaded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_overwrites_existing_state() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));

        store
            .save(&snapshot_of(vec![interface(1, "192.168.1.1/24")]))
            .await
            .unwrap();
        let updated = snapshot_of(vec![interface(1, "192.168.1.2/24")]);
        store.save(&updated).await.unwrap();

        match store.load() {
            LoadResult::Loaded(loaded) => assert_eq!(loaded, updated),
            other => panic!("Expected Loaded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));

        store.save(&Snapshot::new()).await.unwrap();

        match store.load() {
            LoadResult::Loaded(loaded) => assert!(loaded.is_empty()),
            other => panic!("Expected Loaded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn saved_file_lists_interfaces_in_id_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStateStore::new(&path);

        store
            .save(&snapshot_of(vec![
                interface(9, "10.0.0.9/8"),
                interface(2, "10.0.0.2/8"),
            ]))
            .await
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let ids: Vec<u64> = raw["interfaces"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 9]);
        assert_eq!(raw["version"], 1);
    }

    #[test]
    fn path_returns_configured_path() {
        let store = FileStateStore::new("/tmp/test.json");
        assert_eq!(store.path().to_str().unwrap(), "/tmp/test.json");
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let nested_path = dir.path().join("nested").join("deep").join("state.json");
        let store = FileStateStore::new(&nested_path);

        store
            .save(&snapshot_of(vec![interface(1, "192.168.1.1/24")]))
            .await
            .unwrap();

        assert!(nested_path.exists());
        assert!(store.load().is_loaded());
    }
}

mod mock_state_store {
    use super::*;
    use crate::state::mock::MockStateStore;

    #[test]
    fn with_loaded_returns_snapshot() {
        let snapshot = snapshot_of(vec![interface(1, "192.168.1.1/24")]);
        let store = MockStateStore::with_loaded(snapshot.clone());

        match store.load() {
            LoadResult::Loaded(loaded) => assert_eq!(loaded, snapshot),
            other => panic!("Expected Loaded, got {other:?}"),
        }
    }

    #[test]
    fn corrupted_returns_reason() {
        match MockStateStore::corrupted("test reason").load() {
            LoadResult::Corrupted { reason } => assert_eq!(reason, "test reason"),
            other => panic!("Expected Corrupted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_captures_snapshot() {
        let store = MockStateStore::not_found();
        assert!(store.saved_snapshot().is_none());

        let snapshot = snapshot_of(vec![interface(1, "192.168.1.1/24")]);
        store.save(&snapshot).await.unwrap();

        assert_eq!(store.saved_snapshot(), Some(snapshot));
    }
}
