//! Chain primitives: [`Handler`], [`Middleware`], [`Next`], and [`Flow`].
//!
//! A chain is an ordered list of middleware. Each middleware receives the
//! Context and a [`Next`] handle to the remainder of the chain, and reports
//! through [`Flow`] whether the update was claimed. Not calling `next` is the
//! short-circuit: the rest of the chain never runs for this update.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;

/// Boxed future used by closure-based handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of running a middleware (or a whole chain) against one update.
///
/// `Handled` means some unit claimed the update (a gate matched, or a scene
/// owned it); `Continue` means the update fell through unclaimed. This is the
/// explicit signal consumed by the dispatcher instead of ad hoc flags on the
/// Context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Handled,
}

/// Leaf unit of work: takes the Context, produces a side effect (typically a
/// reply) or mutates session state. Default behavior is a no-op.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }
}

/// Chain position unit: runs with a [`Next`] reference to the remainder of
/// the chain. Gating units run their guarded handlers on match and pass on;
/// wrapping units (session, stage) decide whether downstream runs at all.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<Flow>;
}

/// The remainder of a chain. `run` consumes the handle, so a middleware can
/// continue downstream at most once.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Middleware>]) -> Self {
        Self { chain }
    }

    /// Runs the rest of the chain. An empty remainder is a no-op that
    /// reports `Flow::Continue`.
    pub async fn run(self, ctx: &mut Context) -> Result<Flow> {
        match self.chain.split_first() {
            Some((head, rest)) => head.handle(ctx, Next { chain: rest }).await,
            None => Ok(Flow::Continue),
        }
    }
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    async fn handle(&self, ctx: &mut Context) -> Result<()> {
        (self.0)(ctx).await
    }
}

/// Adapts an async closure into a [`Handler`].
///
/// ```ignore
/// let hello = handler_fn(|ctx| {
///     Box::pin(async move {
///         ctx.reply("hello").await?;
///         Ok(())
///     })
/// });
/// ```
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}
