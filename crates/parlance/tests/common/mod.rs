//! Common test utilities for Parlance integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Environment variables that would leak a real key into tests
const KEY_VARS: &[&str] = &[
    "GOOGLE_API_KEY",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "OPENROUTER_API_KEY",
    "BRAVE_API_KEY",
    "PARLANCE_MODEL",
    "GEMINI_MODEL",
    "RUST_LOG",
];

/// Isolated home directory for one test
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub workspace_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let data_dir = temp_dir.path().join(".parlance");
        let workspace_dir = data_dir.join("workspace");

        Ok(Self {
            temp_dir,
            data_dir,
            workspace_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Command for the parlance binary with HOME pointed at the temp dir
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_parlance"));
        cmd.env("HOME", self.temp_dir.path());
        for var in KEY_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Write a config file from a JSON value
    pub fn write_config(&self, config: serde_json::Value) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::write(self.config_file(), serde_json::to_string_pretty(&config)?)?;
        Ok(())
    }

    /// Config pointing the Gemini client at `api_base` with a test key
    pub fn write_gemini_config(&self, api_base: &str) -> anyhow::Result<()> {
        self.write_config(serde_json::json!({
            "provider": { "kind": "gemini", "api_key": "test-key", "api_base": api_base },
            "toolkit": { "workspace": self.workspace_dir.display().to_string() }
        }))
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}

/// Gemini generateContent reply carrying `text`
pub fn gemini_reply(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}
