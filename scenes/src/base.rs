//! Scene contract and the base scene implementation.
//!
//! Scenes are stateless, shared definitions registered once at startup.
//! Whether a scene is active for a conversation — and any scene-local data —
//! lives in the session under the reserved record, never on the scene itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use composer::{Composer, UpdateFilter};
use wabot_core::{Context, Flow, Handler, Middleware, Result};

use crate::record::{clear_record, read_record, write_record, SceneRecord};

/// A named conversational mode: lifecycle hooks plus a private middleware
/// chain that owns updates while the scene is active.
#[async_trait]
pub trait Scene: Send + Sync {
    fn id(&self) -> &str;

    /// Time-to-live in seconds; a record older than this is treated as
    /// inactive (lazily — nothing is purged).
    fn ttl(&self) -> Option<f64>;

    /// Writes the reserved scene record, then runs the enter handlers in order.
    async fn enter_scene(&self, ctx: &mut Context) -> Result<()>;

    /// Runs the leave handlers in order, then deletes the reserved record.
    /// A failing leave handler propagates; later handlers and the deletion
    /// do not run.
    async fn leave_scene(&self, ctx: &mut Context) -> Result<()>;

    /// Processes one update through the scene's private chain.
    async fn handle_update(&self, ctx: &mut Context) -> Result<Flow>;
}

/// Plain scene: enter/leave hooks and a private Composer chain.
pub struct BaseScene {
    id: String,
    composer: Composer,
    enter_handlers: Vec<Arc<dyn Handler>>,
    leave_handlers: Vec<Arc<dyn Handler>>,
    ttl: Option<f64>,
}

impl BaseScene {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            composer: Composer::new(),
            enter_handlers: Vec::new(),
            leave_handlers: Vec::new(),
            ttl: None,
        }
    }

    /// Registers a handler to run when the scene is entered.
    pub fn on_enter(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.enter_handlers.push(handler);
        self
    }

    /// Registers a handler to run when the scene is left.
    pub fn on_leave(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.leave_handlers.push(handler);
        self
    }

    /// Sets the scene's time-to-live in seconds.
    pub fn with_ttl(&mut self, seconds: f64) -> &mut Self {
        self.ttl = Some(seconds);
        self
    }

    // Scene-private registration, same surface as the bot's Composer.

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

    /// True iff the session's recorded scene id matches this scene and the
    /// record has not outlived the TTL.
    pub fn is_active(&self, ctx: &Context) -> bool {
        match read_record(&ctx.session) {
            Some(record) if record.id == self.id => !record.expired(self.ttl),
            _ => false,
        }
    }

    /// Scene-local state for this conversation. Empty when another scene's
    /// record (or none) is present.
    pub fn state(&self, ctx: &Context) -> Map<String, Value> {
        match read_record(&ctx.session) {
            Some(record) if record.id == self.id => record.state,
            _ => Map::new(),
        }
    }

    /// Replaces the scene-local state. If the session's recorded scene id
    /// does not match this scene, the record is re-initialized first.
    pub fn set_state(&self, ctx: &mut Context, state: Map<String, Value>) -> Result<()> {
        let mut record = match read_record(&ctx.session) {
            Some(record) if record.id == self.id => record,
            _ => SceneRecord::new(self.id.clone()),
        };
        record.state = state;
        write_record(&mut ctx.session, &record)
    }

    /// Merges the given entries into the scene-local state.
    pub fn update_state(&self, ctx: &mut Context, updates: Map<String, Value>) -> Result<()> {
        let mut state = self.state(ctx);
        state.extend(updates);
        self.set_state(ctx, state)
    }
}

#[async_trait]
impl Scene for BaseScene {
    fn id(&self) -> &str {
        &self.id
    }

    fn ttl(&self) -> Option<f64> {
        self.ttl
    }

    async fn enter_scene(&self, ctx: &mut Context) -> Result<()> {
        debug!(scene = %self.id, chat_id = %ctx.chat_id(), "step: scene enter");
        write_record(&mut ctx.session, &SceneRecord::new(self.id.clone()))?;
        for handler in &self.enter_handlers {
            handler.handle(ctx).await?;
        }
        Ok(())
    }

    async fn leave_scene(&self, ctx: &mut Context) -> Result<()> {
        debug!(scene = %self.id, chat_id = %ctx.chat_id(), "step: scene leave");
        for handler in &self.leave_handlers {
            handler.handle(ctx).await?;
        }
        clear_record(&mut ctx.session);
        Ok(())
    }

    async fn handle_update(&self, ctx: &mut Context) -> Result<Flow> {
        self.composer.dispatch(ctx).await
    }
}
