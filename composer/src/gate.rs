//! Gating middleware behind the Composer registration methods.
//!
//! Gates are taps: on a match they run their guarded handler, then always
//! pass the update on to the rest of the chain. A gate that matched promotes
//! the chain outcome to `Flow::Handled`.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use wabot_core::{Context, Flow, Handler, Middleware, Next, Result, TextMatch, UpdateKind};

/// Update classes accepted by [`Composer::on`](crate::Composer::on).
///
/// `Message` matches any Context carrying a message payload; `Text` matches
/// any Context whose message carries non-empty text. The remaining variants
/// match the classification tag exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateFilter {
    Message,
    Text,
    CallbackQuery,
    Status,
    Unknown,
}

impl UpdateFilter {
    pub fn matches(&self, ctx: &Context) -> bool {
        match self {
            UpdateFilter::Message => {
                ctx.message.is_some() || ctx.kind() == UpdateKind::Message
            }
            UpdateFilter::Text => ctx.text().is_some_and(|t| !t.is_empty()),
            UpdateFilter::CallbackQuery => ctx.kind() == UpdateKind::CallbackQuery,
            UpdateFilter::Status => ctx.kind() == UpdateKind::Status,
            UpdateFilter::Unknown => ctx.kind() == UpdateKind::Unknown,
        }
    }
}

/// Unconditional tap: runs its handler, then the rest of the chain.
pub(crate) struct Tap {
    pub(crate) handler: Arc<dyn Handler>,
}

#[async_trait]
impl Middleware for Tap {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<Flow> {
        self.handler.handle(ctx).await?;
        next.run(ctx).await
    }
}

pub(crate) struct OnGate {
    pub(crate) filters: Vec<UpdateFilter>,
    pub(crate) handler: Arc<dyn Handler>,
}

#[async_trait]
impl Middleware for OnGate {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<Flow> {
        let matched = self.filters.iter().any(|f| f.matches(ctx));
        if matched {
            self.handler.handle(ctx).await?;
        }
        let flow = next.run(ctx).await?;
        Ok(if matched { Flow::Handled } else { flow })
    }
}

pub(crate) struct HearsGate {
    pub(crate) patterns: Vec<Regex>,
    pub(crate) handler: Arc<dyn Handler>,
}

#[async_trait]
impl Middleware for HearsGate {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<Flow> {
        let text = ctx.text().map(str::to_string);
        let mut matched = false;
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            // Only the first matching pattern triggers execution.
            for pattern in &self.patterns {
                if let Some(captures) = pattern.captures(&text) {
                    let full = captures
                        .get(0)
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default();
                    ctx.text_match = Some(TextMatch {
                        pattern: pattern.as_str().to_string(),
                        matched: full,
                        captures: captures
                            .iter()
                            .skip(1)
                            .map(|group| group.map(|m| m.as_str().to_string()))
                            .collect(),
                    });
                    debug!(pattern = %pattern.as_str(), "step: hears matched");
                    self.handler.handle(ctx).await?;
                    matched = true;
                    break;
                }
            }
        }
        let flow = next.run(ctx).await?;
        Ok(if matched { Flow::Handled } else { flow })
    }
}

pub(crate) struct CommandGate {
    /// Lowercased command names, without the `/` prefix.
    pub(crate) names: Vec<String>,
    pub(crate) handler: Arc<dyn Handler>,
}

#[async_trait]
impl Middleware for CommandGate {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<Flow> {
        let matched = match ctx.command() {
            Some(name) => self.names.iter().any(|n| *n == name),
            None => false,
        };
        if matched {
            debug!(command = ?ctx.command(), "step: command matched");
            self.handler.handle(ctx).await?;
        }
        let flow = next.run(ctx).await?;
        Ok(if matched { Flow::Handled } else { flow })
    }
}

pub(crate) struct ActionGate {
    pub(crate) triggers: Vec<String>,
    pub(crate) handler: Arc<dyn Handler>,
}

#[async_trait]
impl Middleware for ActionGate {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<Flow> {
        let matched = ctx
            .callback_query
            .as_ref()
            .is_some_and(|cb| self.triggers.iter().any(|t| *t == cb.data));
        if matched {
            self.handler.handle(ctx).await?;
        }
        let flow = next.run(ctx).await?;
        Ok(if matched { Flow::Handled } else { flow })
    }
}

pub(crate) type Predicate = Box<dyn Fn(&Context) -> bool + Send + Sync>;

/// Continues the chain only when the predicate holds (`invert` flips it).
pub(crate) struct FilterGate {
    pub(crate) predicate: Predicate,
    pub(crate) invert: bool,
}

#[async_trait]
impl Middleware for FilterGate {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<Flow> {
        if (self.predicate)(ctx) != self.invert {
            next.run(ctx).await
        } else {
            Ok(Flow::Continue)
        }
    }
}
