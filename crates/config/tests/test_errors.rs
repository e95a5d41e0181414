//! Tests for error handling

use parlance_config::{Config, ConfigError};
use std::io;

#[test]
fn test_io_error_display() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let err = ConfigError::Io(io_err);

    let display = format!("{}", err);
    assert!(display.contains("CONFIG IO ERROR"));
    assert!(display.contains("file not found"));
}

#[test]
fn test_json_error_display() {
    let json_err: serde_json::Error =
        serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
    let err = ConfigError::Json(json_err);

    assert!(err.to_string().contains("CONFIG PARSE FAILED"));
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
    let err: ConfigError = io_err.into();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[tokio::test]
async fn test_load_invalid_json_is_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("config.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let result = Config::load_from(&path).await;
    assert!(matches!(result, Err(ConfigError::Json(_))));
}
