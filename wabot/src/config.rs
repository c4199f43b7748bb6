//! Bot configuration: instance credentials, API host, log path.
//! Loaded from the environment (SDKWA_ID_INSTANCE, SDKWA_API_TOKEN,
//! SDKWA_API_HOST, LOG_FILE) or from a JSON document.

use std::env;

use serde_json::Value;

use wabot_core::{BotError, Result};

/// Minimal bot configuration: SDKWA instance access plus logging.
pub struct BotConfig {
    pub id_instance: String,
    pub api_token: String,
    pub api_host: Option<String>,
    pub log_file: Option<String>,
}

impl BotConfig {
    pub fn new(id_instance: impl Into<String>, api_token: impl Into<String>) -> Result<Self> {
        Self::build(id_instance.into(), api_token.into(), None, None)
    }

    /// Loads from environment variables. SDKWA_ID_INSTANCE and
    /// SDKWA_API_TOKEN are required; SDKWA_API_HOST and LOG_FILE optional.
    pub fn from_env() -> Result<Self> {
        let id_instance = env::var("SDKWA_ID_INSTANCE")
            .map_err(|_| BotError::Config("SDKWA_ID_INSTANCE not set".into()))?;
        let api_token = env::var("SDKWA_API_TOKEN")
            .map_err(|_| BotError::Config("SDKWA_API_TOKEN not set".into()))?;
        Self::build(
            id_instance,
            api_token,
            env::var("SDKWA_API_HOST").ok(),
            env::var("LOG_FILE").ok(),
        )
    }

    /// Parses a JSON configuration document with `idInstance`,
    /// `apiTokenInstance`, and optional `apiUrl` fields.
    pub fn from_json(config: &Value) -> Result<Self> {
        let field = |name: &str| -> Result<String> {
            config
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    BotError::Config(format!("missing required configuration field: {name}"))
                })
        };
        Self::build(
            field("idInstance")?,
            field("apiTokenInstance")?,
            config
                .get("apiUrl")
                .and_then(Value::as_str)
                .map(str::to_string),
            None,
        )
    }

    fn build(
        id_instance: String,
        api_token: String,
        api_host: Option<String>,
        log_file: Option<String>,
    ) -> Result<Self> {
        if id_instance.is_empty() {
            return Err(BotError::Config("idInstance must not be empty".into()));
        }
        if api_token.is_empty() {
            return Err(BotError::Config("apiTokenInstance must not be empty".into()));
        }
        Ok(Self {
            id_instance,
            api_token,
            api_host,
            log_file,
        })
    }
}
