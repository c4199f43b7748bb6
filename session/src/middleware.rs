//! Session middleware: loads the conversation's session before downstream
//! runs and writes it back afterwards, on success and on failure alike.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use wabot_core::{Context, Flow, Middleware, Next, Result};

use crate::store::{MemorySessionStore, SessionStore};

/// Derives the store key from a Context. Defaults to the conversation id.
pub type KeyGenerator = Arc<dyn Fn(&Context) -> String + Send + Sync>;

fn default_key_generator() -> KeyGenerator {
    Arc::new(|ctx: &Context| {
        if ctx.chat_id().is_empty() {
            "default".to_string()
        } else {
            ctx.chat_id().to_string()
        }
    })
}

/// Wrapping middleware around the rest of the chain. The write-back runs in
/// a finally-equivalent path: session mutations made before a handler error
/// are not lost.
pub struct SessionMiddleware {
    store: Arc<dyn SessionStore>,
    key_generator: KeyGenerator,
}

impl SessionMiddleware {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            key_generator: default_key_generator(),
        }
    }

    /// Overrides how the store key is derived from a Context.
    pub fn with_key_generator(
        mut self,
        key_generator: impl Fn(&Context) -> String + Send + Sync + 'static,
    ) -> Self {
        self.key_generator = Arc::new(key_generator);
        self
    }
}

/// Session middleware with an in-memory store and the default key.
pub fn session() -> Arc<SessionMiddleware> {
    Arc::new(SessionMiddleware::new(Arc::new(MemorySessionStore::new())))
}

/// Session middleware over the given store.
pub fn session_with_store(store: Arc<dyn SessionStore>) -> Arc<SessionMiddleware> {
    Arc::new(SessionMiddleware::new(store))
}

#[async_trait]
impl Middleware for SessionMiddleware {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<Flow> {
        let session_key = (self.key_generator)(ctx);
        ctx.session = self.store.get(&session_key).await?.unwrap_or_default();
        debug!(session_key = %session_key, keys = ctx.session.len(), "step: session loaded");

        let result = next.run(ctx).await;

        // Write-back happens whether downstream succeeded or failed.
        let write_back = self.store.set(&session_key, ctx.session.clone()).await;
        match (result, write_back) {
            (Ok(flow), Ok(())) => {
                debug!(session_key = %session_key, "step: session saved");
                Ok(flow)
            }
            (Ok(_), Err(save_err)) => Err(save_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(save_err)) => {
                warn!(session_key = %session_key, error = %save_err, "session write-back failed after handler error");
                Err(err)
            }
        }
    }
}
