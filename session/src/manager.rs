//! Direct store access for code outside the middleware chain (tests,
//! maintenance commands, the bot facade).

use std::sync::Arc;

use serde_json::{Map, Value};

use wabot_core::{Context, Result};

use crate::middleware::SessionMiddleware;
use crate::store::{MemorySessionStore, SessionStore};

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    /// Session for the key, empty when absent.
    pub async fn get_session(&self, session_key: &str) -> Result<Map<String, Value>> {
        Ok(self.store.get(session_key).await?.unwrap_or_default())
    }

    pub async fn set_session(
        &self,
        session_key: &str,
        session_data: Map<String, Value>,
    ) -> Result<()> {
        self.store.set(session_key, session_data).await
    }

    pub async fn delete_session(&self, session_key: &str) -> Result<()> {
        self.store.delete(session_key).await
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Middleware over this manager's store.
    pub fn middleware(&self) -> Arc<SessionMiddleware> {
        Arc::new(SessionMiddleware::new(self.store.clone()))
    }

    /// Middleware over this manager's store with a custom key.
    pub fn middleware_with_key(
        &self,
        key_generator: impl Fn(&Context) -> String + Send + Sync + 'static,
    ) -> Arc<SessionMiddleware> {
        Arc::new(SessionMiddleware::new(self.store.clone()).with_key_generator(key_generator))
    }
}
