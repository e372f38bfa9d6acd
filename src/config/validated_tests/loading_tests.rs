//! Tests for configuration loading, defaults, and validation.

use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, tempdir};

use super::*;

mod defaults {
    use super::*;

    #[test]
    fn no_sources_uses_defaults() {
        let config = ValidatedConfig::from_raw(&cli(&[]), None).unwrap();

        assert_eq!(config.watchers, 2);
        assert_eq!(config.format, OutputFormat::Text);
        assert!(config.state_file.is_none());
        assert!(!config.once);
        assert!(config.steps.is_empty());
        assert!(!config.verbose);
    }

    #[test]
    fn display_summarizes_config() {
        let config = ValidatedConfig::from_raw(&cli(&["--once"]), None).unwrap();

        assert_eq!(
            config.to_string(),
            "Config { watchers: 2, format: text, state_file: none, once: true, steps: 0 }"
        );
    }
}

mod validation {
    use super::*;

    #[test]
    fn zero_watchers_is_rejected() {
        let result = ValidatedConfig::from_raw(&cli(&["--watchers", "0"]), None);

        assert!(matches!(
            result,
            Err(ConfigError::InvalidWatchers { value: 0, .. })
        ));
    }

    #[test]
    fn too_many_watchers_is_rejected() {
        let toml = toml("[observers]\ncount = 5000");
        let result = ValidatedConfig::from_raw(&cli(&[]), Some(&toml));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidWatchers { value: 5000, .. })
        ));
    }

    #[test]
    fn unknown_toml_format_is_rejected() {
        let toml = toml("[observers]\nformat = \"xml\"");
        let result = ValidatedConfig::from_raw(&cli(&[]), Some(&toml));

        match result {
            Err(ConfigError::InvalidFormat { value }) => assert_eq!(value, "xml"),
            other => panic!("Expected InvalidFormat, got {other:?}"),
        }
    }

    #[test]
    fn toml_format_is_case_insensitive() {
        let toml = toml("[observers]\nformat = \"JSON\"");
        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();

        assert_eq!(config.format, OutputFormat::Json);
    }
}

mod file_loading {
    use super::*;

    #[test]
    fn load_reads_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [observers]
            count = 3

            [[step]]
            action = "add_interface"
            "#
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let config = ValidatedConfig::load(&cli(&["--config", path])).unwrap();

        assert_eq!(config.watchers, 3);
        assert_eq!(config.steps.len(), 1);
    }

    #[test]
    fn load_without_config_file_uses_cli_only() {
        let config = ValidatedConfig::load(&cli(&["--watchers", "7"])).unwrap();
        assert_eq!(config.watchers, 7);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let result = ValidatedConfig::load(&cli(&["--config", path.to_str().unwrap()]));

        assert!(matches!(result, Err(ConfigError::FileRead { .. })));
    }

    #[test]
    fn load_invalid_toml_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[observers").unwrap();

        let result = ValidatedConfig::load(&cli(&["--config", file.path().to_str().unwrap()]));

        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }
}

mod write_default_config {
    use super::*;
    use crate::config::write_default_config;

    #[test]
    fn writes_loadable_template() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("netif-watch.toml");

        write_default_config(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[observers]"));

        let config = ValidatedConfig::load(&cli(&["--config", path.to_str().unwrap()])).unwrap();
        assert_eq!(config.watchers, 2);
        assert!(!config.steps.is_empty());
    }

    #[test]
    fn unwritable_path_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("netif-watch.toml");

        let result = write_default_config(&path);

        assert!(matches!(result, Err(ConfigError::FileWrite { .. })));
    }
}
