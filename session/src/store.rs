//! Session storage backends.
//!
//! A session is a JSON object keyed by conversation id. Stores only promise
//! read-your-writes within sequential update processing; there is no
//! durability guarantee beyond what the backend provides.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;

use wabot_core::{BotError, Result};

/// Pluggable key-value store for per-conversation session data.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session for the key, or `None` when absent.
    async fn get(&self, session_key: &str) -> Result<Option<Map<String, Value>>>;

    /// Overwrites the session for the key.
    async fn set(&self, session_key: &str, session_data: Map<String, Value>) -> Result<()>;

    /// Removes the session for the key. Removing an absent key is not an error.
    async fn delete(&self, session_key: &str) -> Result<()>;

    /// Removes all sessions.
    async fn clear(&self) -> Result<()>;
}

/// In-memory store. Sessions vanish when the process exits.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Map<String, Value>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Map<String, Value>>>> {
        self.sessions
            .lock()
            .map_err(|_| BotError::Session("session store lock poisoned".into()))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_key: &str) -> Result<Option<Map<String, Value>>> {
        Ok(self.lock()?.get(session_key).cloned())
    }

    async fn set(&self, session_key: &str, session_data: Map<String, Value>) -> Result<()> {
        self.lock()?.insert(session_key.to_string(), session_data);
        Ok(())
    }

    async fn delete(&self, session_key: &str) -> Result<()> {
        self.lock()?.remove(session_key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}

/// File-backed store: the whole session map is kept in memory and written to
/// a single JSON file on every mutation.
pub struct FileSessionStore {
    file_path: PathBuf,
    sessions: Mutex<HashMap<String, Map<String, Value>>>,
}

impl FileSessionStore {
    /// Opens (or lazily creates) the backing file. A missing or unreadable
    /// file starts an empty store rather than failing startup.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let sessions = match fs::read_to_string(&file_path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!(path = %file_path.display(), error = %e, "session file unreadable, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            file_path,
            sessions: Mutex::new(sessions),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Map<String, Value>>>> {
        self.sessions
            .lock()
            .map_err(|_| BotError::Session("session store lock poisoned".into()))
    }

    fn persist(&self, sessions: &HashMap<String, Map<String, Value>>) -> Result<()> {
        let raw = serde_json::to_string_pretty(sessions)?;
        fs::write(&self.file_path, raw)?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, session_key: &str) -> Result<Option<Map<String, Value>>> {
        Ok(self.lock()?.get(session_key).cloned())
    }

    async fn set(&self, session_key: &str, session_data: Map<String, Value>) -> Result<()> {
        let mut sessions = self.lock()?;
        sessions.insert(session_key.to_string(), session_data);
        self.persist(&sessions)
    }

    async fn delete(&self, session_key: &str) -> Result<()> {
        let mut sessions = self.lock()?;
        sessions.remove(session_key);
        self.persist(&sessions)
    }

    async fn clear(&self) -> Result<()> {
        let mut sessions = self.lock()?;
        sessions.clear();
        self.persist(&sessions)
    }
}
