//! The bot facade: registration surface, update dispatch, polling loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use composer::{Composer, UpdateFilter};
use sdkwa_client::SdkwaClient;
use session::SessionManager;
use wabot_core::{Api, BotError, Contact, Context, Handler, Middleware, Result};

use crate::config::BotConfig;

/// Polling loop tuning.
#[derive(Debug, Clone)]
pub struct PollingOptions {
    /// Pause between successful fetch rounds.
    pub poll_interval: Duration,
    /// Pause after a failed fetch before trying again.
    pub retry_delay: Duration,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Receives errors that escape the middleware chain. Registered via
/// [`WhatsAppBot::catch`]; without one, errors are logged and swallowed.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle(&self, error: &BotError, ctx: Option<&mut Context>);
}

/// WhatsApp bot over the SDKWA API with a middleware-chain interface.
///
/// The session middleware is installed first at construction, so `ctx.session`
/// is always populated (and written back) around everything registered later.
pub struct WhatsAppBot {
    api: Arc<dyn Api>,
    composer: Composer,
    sessions: SessionManager,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    options: PollingOptions,
    running: AtomicBool,
}

impl WhatsAppBot {
    pub fn new(config: &BotConfig) -> Result<Self> {
        let client = match &config.api_host {
            Some(host) => SdkwaClient::with_host(host, &config.id_instance, &config.api_token)?,
            None => SdkwaClient::new(&config.id_instance, &config.api_token)?,
        };
        info!(instance = %config.id_instance, "bot initialized");
        Ok(Self::with_api(Arc::new(client)))
    }

    /// Builds a bot over any [`Api`] implementation, with in-memory sessions.
    pub fn with_api(api: Arc<dyn Api>) -> Self {
        Self::with_api_and_sessions(api, SessionManager::in_memory())
    }

    pub fn with_api_and_sessions(api: Arc<dyn Api>, sessions: SessionManager) -> Self {
        let mut composer = Composer::new();
        composer.use_middleware(sessions.middleware());
        Self {
            api,
            composer,
            sessions,
            error_handler: None,
            options: PollingOptions::default(),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_options(mut self, options: PollingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn api(&self) -> &Arc<dyn Api> {
        &self.api
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Sets the error handler for errors escaping the chain.
    pub fn catch(&mut self, handler: Arc<dyn ErrorHandler>) -> &mut Self {
        self.error_handler = Some(handler);
        self
    }

    // Registration surface, delegated to the inner Composer.

    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.composer.use_middleware(middleware);
        self
    }

    pub fn use_handler(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.composer.use_handler(handler);
        self
    }

    pub fn on(
        &mut self,
        filters: impl IntoIterator<Item = UpdateFilter>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.composer.on(filters, handler);
        self
    }

    pub fn hears(
        &mut self,
        patterns: impl IntoIterator<Item = impl AsRef<str>>,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self> {
        self.composer.hears(patterns, handler)?;
        Ok(self)
    }

    pub fn command(
        &mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.composer.command(names, handler);
        self
    }

    pub fn action(
        &mut self,
        triggers: impl IntoIterator<Item = impl Into<String>>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.composer.action(triggers, handler);
        self
    }

    pub fn start(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.composer.start(handler);
        self
    }

    pub fn help(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.composer.help(handler);
        self
    }

    pub fn filter(
        &mut self,
        predicate: impl Fn(&Context) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.composer.filter(predicate);
        self
    }

    pub fn drop_if(
        &mut self,
        predicate: impl Fn(&Context) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.composer.drop_if(predicate);
        self
    }

    /// Dispatches one raw update through the chain. Errors are routed to the
    /// `catch` handler (or logged) and never propagate: one bad update must
    /// not stop the bot.
    pub async fn handle_update(&self, update: Value) {
        let mut ctx = Context::from_update(update, self.api.clone());
        debug!(chat_id = %ctx.chat_id(), kind = ?ctx.kind(), "step: update received");
        if let Err(dispatch_error) = self.composer.dispatch(&mut ctx).await {
            match &self.error_handler {
                Some(handler) => handler.handle(&dispatch_error, Some(&mut ctx)).await,
                None => error!(
                    error = %dispatch_error,
                    chat_id = %ctx.chat_id(),
                    "unhandled error while dispatching update"
                ),
            }
        }
    }

    /// Drains pending notifications, acknowledging each one. Returns the raw
    /// update bodies in arrival order.
    pub async fn get_updates(&self) -> Result<Vec<Value>> {
        let mut updates = Vec::new();
        while let Some(notification) = self.api.receive_notification().await? {
            self.api.delete_notification(notification.receipt_id).await?;
            updates.push(notification.body);
        }
        Ok(updates)
    }

    /// Polls for updates until [`stop`](Self::stop) is called. Updates are
    /// dispatched sequentially in arrival order; a fetch failure waits out
    /// the retry delay and the loop continues.
    pub async fn start_polling(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("bot is already polling");
            return;
        }
        info!("step: polling started");
        while self.running.load(Ordering::SeqCst) {
            match self.get_updates().await {
                Ok(updates) => {
                    for update in updates {
                        self.handle_update(update).await;
                    }
                    tokio::time::sleep(self.options.poll_interval).await;
                }
                Err(fetch_error) => {
                    error!(error = %fetch_error, "failed to fetch updates");
                    tokio::time::sleep(self.options.retry_delay).await;
                }
            }
        }
        info!("step: polling stopped");
    }

    /// Asks the polling loop to exit after its current round.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_polling(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // Send helpers for code that talks to a conversation outside a Context.

    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<Value> {
        self.api.send_message(chat_id, text).await
    }

    pub async fn send_photo(
        &self,
        chat_id: &str,
        photo_url: &str,
        caption: Option<&str>,
    ) -> Result<Value> {
        self.api
            .send_file_by_url(chat_id, photo_url, "photo.jpg", caption)
            .await
    }

    pub async fn send_document(
        &self,
        chat_id: &str,
        document_url: &str,
        file_name: &str,
        caption: Option<&str>,
    ) -> Result<Value> {
        self.api
            .send_file_by_url(chat_id, document_url, file_name, caption)
            .await
    }

    pub async fn send_audio(
        &self,
        chat_id: &str,
        audio_url: &str,
        caption: Option<&str>,
    ) -> Result<Value> {
        self.api
            .send_file_by_url(chat_id, audio_url, "audio.mp3", caption)
            .await
    }

    pub async fn send_location(
        &self,
        chat_id: &str,
        latitude: f64,
        longitude: f64,
        name: Option<&str>,
        address: Option<&str>,
    ) -> Result<Value> {
        self.api
            .send_location(
                chat_id,
                latitude,
                longitude,
                name.unwrap_or("Location"),
                address.unwrap_or(""),
            )
            .await
    }

    pub async fn send_contact(&self, chat_id: &str, contact: &Contact) -> Result<Value> {
        self.api.send_contact(chat_id, contact).await
    }
}
