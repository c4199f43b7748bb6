//! # Composer
//!
//! Builds a single dispatchable chain from an ordered list of middleware and
//! handlers, with gating by update class (`on`), text pattern (`hears`),
//! command name (`command`), and callback data (`action`). Gated units are
//! taps in a flat chain: a non-matching gate skips its handler and the chain
//! continues; wrapping middleware (session, stage) decide themselves whether
//! downstream runs.

mod gate;

use std::sync::Arc;

use async_trait::async_trait;
use regex::RegexBuilder;
use tracing::debug;

use wabot_core::{BotError, Context, Flow, Handler, Middleware, Next, Result};

pub use gate::UpdateFilter;

/// Runs a list of handlers in registration order. Composition is
/// associative: a `Sequence` may itself appear inside another one.
struct Sequence {
    handlers: Vec<Arc<dyn Handler>>,
}

#[async_trait]
impl Handler for Sequence {
    async fn handle(&self, ctx: &mut Context) -> Result<()> {
        for handler in &self.handlers {
            handler.handle(ctx).await?;
        }
        Ok(())
    }
}

/// Composes handlers into one. Zero handlers yield a no-op unit.
pub fn compose(mut handlers: Vec<Arc<dyn Handler>>) -> Arc<dyn Handler> {
    if handlers.len() == 1 {
        return handlers.remove(0);
    }
    Arc::new(Sequence { handlers })
}

/// Ordered middleware chain with fluent registration.
#[derive(Default)]
pub struct Composer {
    chain: Vec<Arc<dyn Middleware>>,
}

impl Composer {
    pub fn new() -> Self {
        Self { chain: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Appends a middleware to the end of the chain.
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.chain.push(middleware);
        self
    }

    /// Appends a handler that runs on every update (an unconditional tap).
    pub fn use_handler(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.use_middleware(Arc::new(gate::Tap { handler }))
    }

    /// Runs `handler` only for updates matching one of the given classes.
    pub fn on(
        &mut self,
        filters: impl IntoIterator<Item = UpdateFilter>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.use_middleware(Arc::new(gate::OnGate {
            filters: filters.into_iter().collect(),
            handler,
        }))
    }

    /// Runs `handler` when the message text matches one of the patterns.
    /// Plain strings compile as case-insensitive regular expressions; an
    /// invalid pattern is a configuration error.
    pub fn hears(
        &mut self,
        patterns: impl IntoIterator<Item = impl AsRef<str>>,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self> {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let regex = RegexBuilder::new(pattern.as_ref())
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    BotError::Config(format!("invalid hears pattern {:?}: {}", pattern.as_ref(), e))
                })?;
            compiled.push(regex);
        }
        Ok(self.use_middleware(Arc::new(gate::HearsGate {
            patterns: compiled,
            handler,
        })))
    }

    /// Runs `handler` for `/name` messages whose first token matches one of
    /// the names, case-insensitively.
    pub fn command(
        &mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.use_middleware(Arc::new(gate::CommandGate {
            names: names.into_iter().map(|n| n.into().to_lowercase()).collect(),
            handler,
        }))
    }

    /// Runs `handler` for callback queries whose data equals one of the triggers.
    pub fn action(
        &mut self,
        triggers: impl IntoIterator<Item = impl Into<String>>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.use_middleware(Arc::new(gate::ActionGate {
            triggers: triggers.into_iter().map(Into::into).collect(),
            handler,
        }))
    }

    /// Sugar for `command(["start"], handler)`.
    pub fn start(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.command(["start"], handler)
    }

    /// Sugar for `command(["help"], handler)`.
    pub fn help(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.command(["help"], handler)
    }

    /// Continues the chain only when the predicate holds for the update.
    pub fn filter(
        &mut self,
        predicate: impl Fn(&Context) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.use_middleware(Arc::new(gate::FilterGate {
            predicate: Box::new(predicate),
            invert: false,
        }))
    }

    /// Stops the chain when the predicate holds (the negation of [`filter`](Self::filter)).
    pub fn drop_if(
        &mut self,
        predicate: impl Fn(&Context) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.use_middleware(Arc::new(gate::FilterGate {
            predicate: Box::new(predicate),
            invert: true,
        }))
    }

    /// Runs the chain against one update. Reports whether any unit claimed it.
    pub async fn dispatch(&self, ctx: &mut Context) -> Result<Flow> {
        debug!(
            chat_id = %ctx.chat_id(),
            units = self.chain.len(),
            "step: chain dispatch"
        );
        Next::new(&self.chain).run(ctx).await
    }
}
