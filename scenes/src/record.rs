//! Persisted scene state layout.
//!
//! The reserved session key `__scene` holds a [`SceneRecord`]; wizard scenes
//! nest a [`WizardState`] under `state.wizard`. Scene objects themselves stay
//! immutable — everything per-conversation lives here, inside the session.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use wabot_core::{Result, SCENE_SESSION_KEY};

/// Active-scene record stored under the reserved session key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneRecord {
    pub id: String,
    #[serde(default)]
    pub state: Map<String, Value>,
    /// Seconds since the Unix epoch at enter time.
    pub entered_at: f64,
}

impl SceneRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Map::new(),
            entered_at: now_seconds(),
        }
    }

    /// Whether this record is past the given TTL. `None` never expires.
    pub fn expired(&self, ttl: Option<f64>) -> bool {
        match ttl {
            Some(ttl) => now_seconds() - self.entered_at > ttl,
            None => false,
        }
    }
}

/// Wizard cursor state nested under `state.wizard`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WizardState {
    #[serde(default)]
    pub current_step: usize,
    /// Step data keyed by step index rendered as a string.
    #[serde(default)]
    pub step_data: Map<String, Value>,
    #[serde(default)]
    pub completed_steps: Vec<usize>,
    #[serde(default)]
    pub completed: bool,
}

/// Current time as float seconds since the Unix epoch.
pub fn now_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Reads the scene record out of a session map, tolerating absence and
/// malformed payloads alike (both mean "no active scene").
pub fn read_record(session: &Map<String, Value>) -> Option<SceneRecord> {
    session
        .get(SCENE_SESSION_KEY)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

pub fn write_record(session: &mut Map<String, Value>, record: &SceneRecord) -> Result<()> {
    session.insert(SCENE_SESSION_KEY.to_string(), serde_json::to_value(record)?);
    Ok(())
}

pub fn clear_record(session: &mut Map<String, Value>) {
    session.remove(SCENE_SESSION_KEY);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip() {
        let mut session = Map::new();
        let record = SceneRecord::new("greeting");
        write_record(&mut session, &record).unwrap();

        let loaded = read_record(&session).unwrap();
        assert_eq!(loaded.id, "greeting");
        assert!(loaded.state.is_empty());

        clear_record(&mut session);
        assert!(read_record(&session).is_none());
    }

    #[test]
    fn test_expiry() {
        let mut record = SceneRecord::new("s");
        assert!(!record.expired(None));
        assert!(!record.expired(Some(5.0)));
        record.entered_at = now_seconds() - 10.0;
        assert!(record.expired(Some(5.0)));
        assert!(!record.expired(None));
    }

    #[test]
    fn test_malformed_record_reads_as_none() {
        let mut session = Map::new();
        session.insert(
            SCENE_SESSION_KEY.to_string(),
            serde_json::json!("not a record"),
        );
        assert!(read_record(&session).is_none());
    }
}
