//! Conversation sessions
//!
//! A [`Session`] is an append-only log of turns. The [`SessionStore`] owns every
//! session by key and hands out one lock per session.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use parlance_provider::Message;

/// Session storage errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("SESSION IO ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("SESSION ENCODING ERROR: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Local>,
    /// Capability name, tool turns only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Local::now(),
            tool: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }

    pub fn tool(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool: Some(name.into()),
            ..Self::new(Role::Tool, text)
        }
    }

    /// Provider-facing form of this turn
    pub fn to_message(&self) -> Message {
        match self.role {
            Role::User => Message::user(self.text.clone()),
            Role::Agent => Message::assistant(self.text.clone()),
            Role::Tool => Message::tool(
                self.tool.clone().unwrap_or_else(|| "tool".to_string()),
                self.text.clone(),
            ),
        }
    }
}

/// Map turns to provider messages, preserving order
pub fn to_messages(turns: &[Turn]) -> Vec<Message> {
    turns.iter().map(Turn::to_message).collect()
}

/// A conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session key
    pub key: String,
    turns: Vec<Turn>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    /// Set once the store has dropped this session; it is never saved again
    #[serde(skip)]
    removed: bool,
}

impl Session {
    pub fn new(key: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            key: key.into(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
            removed: false,
        }
    }

    /// Append a turn at the end of the log
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.updated_at = Local::now();
    }

    /// Append several turns in order
    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>) {
        let before = self.turns.len();
        self.turns.extend(turns);
        if self.turns.len() != before {
            self.updated_at = Local::now();
        }
    }

    /// Full ordered history
    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `n` turns, oldest first
    pub fn recent(&self, n: usize) -> &[Turn] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of user turns, i.e. exchanges started in this session
    pub fn exchanges(&self) -> usize {
        self.turns.iter().filter(|t| t.role == Role::User).count()
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Remove every turn
    pub fn clear(&mut self) {
        self.turns.clear();
        self.updated_at = Local::now();
    }
}

/// Lightweight description of a stored session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub key: String,
    pub turns: usize,
    pub exchanges: usize,
    pub updated_at: DateTime<Local>,
}

type SharedSession = Arc<Mutex<Session>>;

/// Owns all sessions by key
///
/// Sessions are created on first use and live until cleared or removed. The map
/// lock is only held for lookup and insert; callers hold the per-session lock for
/// the duration of an exchange.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SharedSession>>,
    persist_dir: Option<PathBuf>,
}

impl SessionStore {
    /// Process-memory store
    pub fn in_memory() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            persist_dir: None,
        }
    }

    /// Store that mirrors every session to `<dir>/<key>.json`
    pub fn persistent(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Failed to create sessions dir {:?}: {}", dir, e);
        }
        Self {
            sessions: RwLock::new(HashMap::new()),
            persist_dir: Some(dir),
        }
    }

    /// Get the session for `key`, creating it on first use
    pub async fn get_or_create(&self, key: &str) -> SharedSession {
        if let Some(existing) = self.sessions.read().await.get(key) {
            return existing.clone();
        }

        let session = self.load(key).await.unwrap_or_else(|| {
            debug!("Creating session {}", key);
            Session::new(key)
        });

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(session)))
            .clone()
    }

    /// Get an existing session without creating one
    pub async fn get(&self, key: &str) -> Option<SharedSession> {
        if let Some(existing) = self.sessions.read().await.get(key) {
            return Some(existing.clone());
        }

        let session = self.load(key).await?;
        let mut sessions = self.sessions.write().await;
        Some(
            sessions
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(session)))
                .clone(),
        )
    }

    /// All known session keys, sorted
    pub async fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.read().await.keys().cloned().collect();

        for key in self.list_on_disk().await {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        keys.sort();
        keys
    }

    /// Key, turn count and last update for every session
    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let mut summaries = Vec::new();
        for key in self.list().await {
            if let Some(shared) = self.get(&key).await {
                let session = shared.lock().await;
                summaries.push(SessionSummary {
                    key: session.key.clone(),
                    turns: session.len(),
                    exchanges: session.exchanges(),
                    updated_at: session.updated_at,
                });
            }
        }
        summaries
    }

    /// Empty a session's history. Returns false if the key is unknown.
    pub async fn clear(&self, key: &str) -> Result<bool> {
        let Some(shared) = self.get(key).await else {
            return Ok(false);
        };
        let mut session = shared.lock().await;
        session.clear();
        self.save(&session).await?;
        debug!("Cleared session {}", key);
        Ok(true)
    }

    /// Drop a session entirely. Returns false if the key is unknown.
    ///
    /// Waits for any exchange holding the session to finish, then marks it
    /// removed so a late save cannot bring the file back.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let removed = self.sessions.write().await.remove(key);
        let in_memory = match removed {
            Some(shared) => {
                shared.lock().await.removed = true;
                true
            }
            None => false,
        };

        let on_disk = match self.session_path(key) {
            Some(path) if path.exists() => {
                tokio::fs::remove_file(&path).await?;
                true
            }
            _ => false,
        };

        if in_memory || on_disk {
            debug!("Removed session {}", key);
        }
        Ok(in_memory || on_disk)
    }

    /// Persist a session. No-op for in-memory stores.
    pub async fn save(&self, session: &Session) -> Result<()> {
        let Some(path) = self.session_path(&session.key) else {
            return Ok(());
        };
        if session.removed {
            debug!("Skipping save of removed session {}", session.key);
            return Ok(());
        }
        let content = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&path, content).await?;
        debug!("Saved session {} to {:?}", session.key, path);
        Ok(())
    }

    async fn load(&self, key: &str) -> Option<Session> {
        let path = self.session_path(key)?;
        if !path.exists() {
            return None;
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Session>(&content) {
                Ok(session) if session.key == key => {
                    debug!("Loaded session {}", key);
                    Some(session)
                }
                Ok(session) => {
                    warn!(
                        "Ignoring {:?}: stored key {} does not match {}",
                        path, session.key, key
                    );
                    None
                }
                Err(e) => {
                    warn!("Failed to parse session {}: {}", key, e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read session {}: {}", key, e);
                None
            }
        }
    }

    async fn list_on_disk(&self) -> Vec<String> {
        let mut keys = Vec::new();
        let Some(dir) = &self.persist_dir else {
            return keys;
        };

        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return keys;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // The stored key is authoritative over the file name.
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                    Ok(value) => {
                        if let Some(key) = value["key"].as_str() {
                            keys.push(key.to_string());
                        }
                    }
                    Err(e) => warn!("Skipping unreadable session file {:?}: {}", path, e),
                },
                Err(e) => warn!("Skipping unreadable session file {:?}: {}", path, e),
            }
        }

        keys
    }

    fn session_path(&self, key: &str) -> Option<PathBuf> {
        let dir = self.persist_dir.as_ref()?;
        // Percent-encoding is injective, so distinct keys never share a file
        Some(dir.join(format!("{}.json", urlencoding::encode(key))))
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Agent.to_string(), "agent");
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_value(Role::Agent).unwrap(), "agent");
        let role: Role = serde_json::from_str("\"tool\"").unwrap();
        assert_eq!(role, Role::Tool);
    }

    #[test]
    fn test_turn_to_message() {
        assert_eq!(Turn::user("q").to_message().role, "user");
        assert_eq!(Turn::agent("a").to_message().role, "assistant");

        let msg = Turn::tool("read_file", "data").to_message();
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.name.as_deref(), Some("read_file"));
        assert_eq!(msg.content, "data");
    }

    #[test]
    fn test_recent_window() {
        let mut session = Session::new("k");
        for i in 0..5 {
            session.append(Turn::user(format!("m{}", i)));
        }
        let recent = session.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "m3");
        assert_eq!(recent[1].text, "m4");
        assert_eq!(session.recent(100).len(), 5);
        assert!(session.recent(0).is_empty());
        assert_eq!(session.len(), 5);
    }

    #[test]
    fn test_session_path_encoded() {
        let store = SessionStore::persistent(std::env::temp_dir().join("parlance-path-test"));
        let path = store.session_path("cli:alice/x").unwrap();
        assert!(path.ends_with("cli%3Aalice%2Fx.json"));
        assert_ne!(
            store.session_path("team:alice"),
            store.session_path("team/alice")
        );
        assert_ne!(
            store.session_path("team_alice"),
            store.session_path("team:alice")
        );
        assert!(SessionStore::in_memory().session_path("k").is_none());
    }

    #[test]
    fn test_exchanges_count_user_turns() {
        let mut session = Session::new("k");
        session.extend([Turn::user("q"), Turn::tool("read_file", "x"), Turn::agent("a")]);
        session.append(Turn::user("q2"));
        assert_eq!(session.exchanges(), 2);
        assert!(!session.is_removed());
    }
}
