// crates/proctor-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Parsing, override, and fail-closed validation checks.
// Purpose: Ensure proctor.toml semantics stay stable.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use proctor_config::ConfigError;
use proctor_config::DatabaseType;
use proctor_config::ProctorConfig;
use proctor_config::StorageBackend;
use proctor_store_sqlite::SqliteStoreMode;
use proctor_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: BTreeMap<String, String> =
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_are_valid() {
    let config = ProctorConfig::default();
    config.validate().expect("defaults validate");
    assert_eq!(config.server.bind, "127.0.0.1:8000");
    assert!(config.server.cors);
    assert_eq!(config.storage.backend, StorageBackend::Local);
    assert_eq!(config.storage.video_dir, PathBuf::from("data/videos"));
    assert_eq!(config.storage.report_dir, PathBuf::from("data/reports"));
    assert_eq!(config.storage.import_dir, PathBuf::from("frontend/data"));
    assert_eq!(config.database.store_type, DatabaseType::Sqlite);
}

#[test]
fn empty_file_uses_section_defaults() {
    let config = ProctorConfig::from_toml("").expect("parse");
    config.validate().expect("validate");
    assert_eq!(config.storage.s3.videos_bucket, "videos");
    assert_eq!(config.storage.s3.reports_bucket, "reports");
}

#[test]
fn load_reads_explicit_path() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("proctor.toml");
    fs::write(
        &path,
        r#"
[server]
bind = "0.0.0.0:9000"

[database]
type = "memory"

[storage]
backend = "local"
video_dir = "media/videos"
report_dir = "media/reports"

[audit]
enabled = false
"#,
    )
    .expect("write config");

    let config = ProctorConfig::load_file(Some(&path)).expect("load");
    config.validate().expect("validate");
    assert_eq!(config.server.bind_addr().expect("addr").port(), 9000);
    assert_eq!(config.database.store_type, DatabaseType::Memory);
    assert!(config.database.path.is_none());
    assert_eq!(config.storage.video_dir, PathBuf::from("media/videos"));
    assert!(!config.audit.enabled);
}

#[test]
fn missing_explicit_path_fails() {
    let dir = TempDir::new().expect("tempdir");
    let err = ProctorConfig::load_file(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn unknown_fields_are_rejected() {
    let err = ProctorConfig::from_toml("[server]\nport = 80\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn memory_database_rejects_path() {
    let config =
        ProctorConfig::from_toml("[database]\ntype = \"memory\"\npath = \"x.db\"\n").expect("parse");
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn sqlite_pragmas_default_to_wal_full() {
    let config = ProctorConfig::from_toml("[database]\ntype = \"sqlite\"\n").expect("parse");
    assert_eq!(config.database.journal_mode, SqliteStoreMode::Wal);
    assert_eq!(config.database.sync_mode, SqliteSyncMode::Full);
}

#[test]
fn sqlite_pragmas_are_configurable() {
    let config = ProctorConfig::from_toml(
        "[database]\ntype = \"sqlite\"\npath = \"x.db\"\njournal_mode = \"delete\"\nsync_mode = \"normal\"\n",
    )
    .expect("parse");
    config.validate().expect("validate");
    assert_eq!(config.database.journal_mode, SqliteStoreMode::Delete);
    assert_eq!(config.database.sync_mode, SqliteSyncMode::Normal);
    let err = ProctorConfig::from_toml("[database]\njournal_mode = \"truncate\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn invalid_bind_is_rejected() {
    let config = ProctorConfig::from_toml("[server]\nbind = \"not-an-addr\"\n").expect("parse");
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn s3_endpoint_requires_allow_http_for_plaintext() {
    let toml = r#"
[storage]
backend = "s3"

[storage.s3]
endpoint = "http://localhost:9000"
"#;
    let mut config = ProctorConfig::from_toml(toml).expect("parse");
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    config.storage.s3.allow_http = true;
    config.validate().expect("validate with allow_http");
}

#[test]
fn s3_prefix_rejects_traversal() {
    let toml = "[storage]\nbackend = \"s3\"\n\n[storage.s3]\nprefix = \"a/../b\"\n";
    let config = ProctorConfig::from_toml(toml).expect("parse");
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn environment_overrides_apply() {
    let mut config = ProctorConfig::default();
    config
        .apply_overrides(overrides(&[
            ("STORAGE_BACKEND", "S3"),
            ("PROCTOR_DATABASE_PATH", "/var/lib/proctor/records.db"),
            ("PROCTOR_BIND", "0.0.0.0:8080"),
            ("PROCTOR_S3_VIDEOS_BUCKET", "rec-videos"),
            ("PROCTOR_S3_REPORTS_BUCKET", "rec-reports"),
            ("PROCTOR_S3_ENDPOINT", "https://s3.example.test"),
        ]))
        .expect("overrides");
    config.validate().expect("validate");

    assert_eq!(config.storage.backend, StorageBackend::S3);
    assert_eq!(config.database.store_type, DatabaseType::Sqlite);
    assert_eq!(config.database.path, Some(PathBuf::from("/var/lib/proctor/records.db")));
    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert_eq!(config.storage.s3.videos_bucket, "rec-videos");
    assert_eq!(config.storage.s3.reports_bucket, "rec-reports");
    assert_eq!(config.storage.s3.endpoint.as_deref(), Some("https://s3.example.test"));
}

#[test]
fn unknown_storage_backend_override_fails() {
    let mut config = ProctorConfig::default();
    let err = config.apply_overrides(overrides(&[("STORAGE_BACKEND", "deta")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}
