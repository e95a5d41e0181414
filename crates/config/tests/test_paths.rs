//! Tests for path utilities

use parlance_config::{config_path, data_dir, sessions_dir, workspace_path};

#[test]
fn test_default_layout_under_data_dir() {
    let data = data_dir();
    assert!(data.ends_with(".parlance"));
    assert_eq!(config_path(), data.join("config.json"));
    assert_eq!(workspace_path(), data.join("workspace"));
    assert_eq!(sessions_dir(), data.join("sessions"));
}
