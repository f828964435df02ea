//! Integration-level unit tests for the SettingsEngine public API.
//!
//! These tests exercise the SettingsEngine through its public trait interface,
//! validating default loading, value persistence, and reset behavior.

use shelfmark::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use shelfmark::types::errors::SettingsError;
use shelfmark::types::settings::AppSettings;
use tempfile::TempDir;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir
        .path()
        .join("settings.json")
        .to_string_lossy()
        .to_string();
    SettingsEngine::new(Some(path))
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();

    assert_eq!(settings, AppSettings::default());
    assert_eq!(settings.database.busy_timeout_ms, 5_000);
    assert_eq!(settings.logging.filter, "info,shelfmark=debug");
    assert_eq!(settings.rpc.default_page_size, 50);
}

/// A change made through `set_value` is visible to a fresh engine reading the same file.
#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine
            .set_value("database.busy_timeout_ms", serde_json::json!(250))
            .unwrap();
        engine
            .set_value("logging.filter", serde_json::json!("warn"))
            .unwrap();
    }

    let mut engine = engine_in_temp(&dir);
    let settings = engine.load().unwrap();
    assert_eq!(settings.database.busy_timeout_ms, 250);
    assert_eq!(settings.logging.filter, "warn");
}

#[test]
fn test_set_value_rejects_unknown_key_and_bad_type() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    assert!(matches!(
        engine.set_value("database.nope", serde_json::json!(1)),
        Err(SettingsError::InvalidKey(_))
    ));
    assert!(matches!(engine.set_value("", serde_json::json!(1)), Err(SettingsError::InvalidKey(_))));
    assert!(matches!(
        engine.set_value("database.busy_timeout_ms", serde_json::json!("soon")),
        Err(SettingsError::InvalidValue(_))
    ));
    assert_eq!(engine.get_settings(), &AppSettings::default());
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();
    engine
        .set_value("rpc.max_requests_per_second", serde_json::json!(5))
        .unwrap();

    engine.reset().unwrap();

    let mut reloaded = engine_in_temp(&dir);
    assert_eq!(reloaded.load().unwrap(), AppSettings::default());
}

#[test]
fn test_malformed_file_is_serialization_error() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    std::fs::write(engine.get_config_path(), "{ not json").unwrap();

    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

#[test]
fn test_partial_file_fills_missing_sections() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    std::fs::write(
        engine.get_config_path(),
        r#"{"database": {"path": "/tmp/x.db", "busy_timeout_ms": 10}}"#,
    )
    .unwrap();

    let settings = engine.load().unwrap();
    assert_eq!(settings.database.path.as_deref(), Some("/tmp/x.db"));
    assert_eq!(settings.logging, AppSettings::default().logging);
    assert_eq!(engine.database_path(), std::path::PathBuf::from("/tmp/x.db"));
}
