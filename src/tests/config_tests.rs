#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    use crate::config::{self, AppConfig, ScannerConfig, SchedulerConfig};

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite://data/modellwald.db");
        assert_eq!(config.library.root_path, PathBuf::from("."));
        assert_eq!(config.scanner.min_depth, 2);
        assert_eq!(config.scanner.model_search_depth, 5);
        assert_eq!(config.scanner.thumbnail_search_depth, 3);
        assert!(config.scanner.excluded_folders.is_empty());
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.schedule_hour, 3);
        assert!(config::validate(&config).is_ok());
    }

    #[test]
    fn test_struct_defaults_match_embedded_toml() {
        let embedded = AppConfig::default();
        let scanner = ScannerConfig::default();
        let scheduler = SchedulerConfig::default();

        assert_eq!(scanner.ignored_folder_names, embedded.scanner.ignored_folder_names);
        assert_eq!(scanner.min_depth, embedded.scanner.min_depth);
        assert_eq!(scanner.excluded_folders, embedded.scanner.excluded_folders);
        assert_eq!(scanner.model_search_depth, embedded.scanner.model_search_depth);
        assert_eq!(scanner.thumbnail_search_depth, embedded.scanner.thumbnail_search_depth);
        assert_eq!(scheduler.enabled, embedded.scheduler.enabled);
        assert_eq!(scheduler.tick_secs, embedded.scheduler.tick_secs);
        assert_eq!(scheduler.schedule_hour, embedded.scheduler.schedule_hour);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: Vec<(fn(&mut AppConfig), &str)> = vec![
            (|c| c.server.port = 0, "invalid server.port"),
            (|c| c.library.root_path = PathBuf::new(), "library.root_path must not be empty"),
            (|c| c.scanner.min_depth = -1, "scanner.min_depth must be >= 0"),
            (|c| c.scanner.model_search_depth = 0, "scanner.model_search_depth must be in 1..=32"),
            (|c| c.scanner.thumbnail_search_depth = 33, "scanner.thumbnail_search_depth must be in 1..=32"),
            (|c| c.scheduler.tick_secs = 0, "scheduler.tick_secs must be > 0"),
            (|c| c.scheduler.schedule_hour = 24, "scheduler.schedule_hour must be in 0..=23"),
        ];
        for (mutate, expected) in cases {
            let mut config = AppConfig::default();
            mutate(&mut config);
            let err = config::validate(&config).unwrap_err();
            assert!(err.to_string().contains(expected), "{} vs {}", err, expected);
        }
    }

    #[test]
    fn test_min_depth_zero_is_allowed() {
        let mut config = AppConfig::default();
        config.scanner.min_depth = 0;
        assert!(config::validate(&config).is_ok());
    }

    // All env manipulation lives in one test; the test harness runs tests in parallel.
    #[test]
    fn test_load_layers() {
        let loaded = config::load().unwrap();
        assert_eq!(loaded.server.port, 8080);

        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("custom.toml");
        fs::write(
            &file,
            r#"
[server]
port = 7000

[library]
root_path = "/srv/models"

[scanner]
min_depth = 3
"#,
        )
        .unwrap();
        env::set_var("MODELLWALD_CONFIG", file.to_str().unwrap());

        let from_file = config::load().unwrap();
        assert_eq!(from_file.server.port, 7000);
        assert_eq!(from_file.library.root_path, PathBuf::from("/srv/models"));
        assert_eq!(from_file.scanner.min_depth, 3);
        // untouched keys keep their defaults
        assert_eq!(from_file.scanner.model_search_depth, 5);

        // Environment wins over the file
        env::set_var("MODELLWALD__SERVER__PORT", "8888");
        env::set_var("MODELLWALD__SCHEDULER__ENABLED", "false");
        let from_env = config::load().unwrap();
        assert_eq!(from_env.server.port, 8888);
        assert!(!from_env.scheduler.enabled);
        assert_eq!(from_env.scanner.min_depth, 3);

        env::set_var("MODELLWALD__SERVER__PORT", "0");
        let result = config::load();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("invalid server.port"));

        env::remove_var("MODELLWALD__SERVER__PORT");
        env::remove_var("MODELLWALD__SCHEDULER__ENABLED");
        env::remove_var("MODELLWALD_CONFIG");
    }

    #[test]
    fn test_ensure_sqlite_parent_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("subdir/test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        assert!(!db_path.parent().unwrap().exists());

        config::ensure_sqlite_parent_dir(&db_url).unwrap();

        assert!(db_path.parent().unwrap().exists());
    }

    #[test]
    fn test_ensure_sqlite_parent_dir_non_sqlite() {
        // Non-SQLite URL should not create directories
        let result = config::ensure_sqlite_parent_dir("postgres://localhost/db");
        assert!(result.is_ok());
    }
}
