//! Path utilities

use std::path::PathBuf;

/// Data directory (~/.parlance)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".parlance")
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Default workspace for file and command tools
pub fn workspace_path() -> PathBuf {
    data_dir().join("workspace")
}

/// Persisted sessions
pub fn sessions_dir() -> PathBuf {
    data_dir().join("sessions")
}
