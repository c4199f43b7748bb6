//! Stage: scene registry and router.
//!
//! The stage middleware resolves the conversation's active scene on every
//! update. An active scene owns the update entirely: its chain runs and the
//! rest of the outer chain is skipped. Global handlers never fire while a
//! scene is active, and scene-private handlers never leak out of it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, warn};

use wabot_core::{BotError, Context, Flow, Middleware, Next, Result, SceneManager};

use crate::base::Scene;
use crate::record::read_record;

/// Registry mapping scene ids to shared scene definitions.
pub struct Stage {
    scenes: RwLock<HashMap<String, Arc<dyn Scene>>>,
}

impl Stage {
    pub fn new(scenes: Vec<Arc<dyn Scene>>) -> Self {
        let map = scenes
            .into_iter()
            .map(|scene| (scene.id().to_string(), scene))
            .collect();
        Self {
            scenes: RwLock::new(map),
        }
    }

    pub fn register(&self, scene: Arc<dyn Scene>) -> Result<()> {
        self.lock_write()?
            .insert(scene.id().to_string(), scene);
        Ok(())
    }

    pub fn unregister(&self, scene_id: &str) -> Result<()> {
        self.lock_write()?.remove(scene_id);
        Ok(())
    }

    fn lock_read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Arc<dyn Scene>>>> {
        self.scenes
            .read()
            .map_err(|_| BotError::Scene("scene registry lock poisoned".into()))
    }

    fn lock_write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<dyn Scene>>>> {
        self.scenes
            .write()
            .map_err(|_| BotError::Scene("scene registry lock poisoned".into()))
    }

    pub fn scene(&self, scene_id: &str) -> Result<Option<Arc<dyn Scene>>> {
        Ok(self.lock_read()?.get(scene_id).cloned())
    }

    pub fn scene_exists(&self, scene_id: &str) -> Result<bool> {
        Ok(self.scene(scene_id)?.is_some())
    }

    pub fn scene_ids(&self) -> Result<Vec<String>> {
        Ok(self.lock_read()?.keys().cloned().collect())
    }

    /// Resolves the conversation's active scene: the recorded id must be
    /// registered and the record not TTL-expired. Expiry is evaluated here,
    /// lazily — stale records are invisible but never purged.
    pub fn current_scene(&self, ctx: &Context) -> Result<Option<Arc<dyn Scene>>> {
        let Some(record) = read_record(&ctx.session) else {
            return Ok(None);
        };
        let Some(scene) = self.scene(&record.id)? else {
            return Ok(None);
        };
        if record.expired(scene.ttl()) {
            return Ok(None);
        }
        Ok(Some(scene))
    }

    /// Enters the named scene. The currently active scene (if any) is left
    /// first — unconditionally, even when re-entering the same scene.
    /// Returns `Ok(false)` without side effects when the id is unregistered.
    pub async fn enter(&self, scene_id: &str, ctx: &mut Context) -> Result<bool> {
        let Some(scene) = self.scene(scene_id)? else {
            warn!(scene = %scene_id, "enter requested for unregistered scene");
            return Ok(false);
        };
        if let Some(current) = self.current_scene(ctx)? {
            current.leave_scene(ctx).await?;
        }
        scene.enter_scene(ctx).await?;
        Ok(true)
    }

    /// Leaves the active scene. Returns whether a leave actually happened.
    pub async fn leave(&self, ctx: &mut Context) -> Result<bool> {
        match self.current_scene(ctx)? {
            Some(scene) => {
                scene.leave_scene(ctx).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Leaves and immediately re-enters the active scene.
    pub async fn reenter(&self, ctx: &mut Context) -> Result<bool> {
        match self.current_scene(ctx)? {
            Some(scene) => {
                scene.leave_scene(ctx).await?;
                scene.enter_scene(ctx).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The routing middleware installed once into the bot's main chain.
    pub fn middleware(self: &Arc<Self>) -> Arc<dyn Middleware> {
        Arc::new(StageMiddleware {
            stage: Arc::clone(self),
        })
    }

    /// A gate that passes the chain on only while the named scene is active.
    pub fn scene_middleware(self: &Arc<Self>, scene_id: impl Into<String>) -> Arc<dyn Middleware> {
        Arc::new(SceneGate {
            stage: Arc::clone(self),
            scene_id: scene_id.into(),
        })
    }
}

#[async_trait]
impl SceneManager for Stage {
    async fn enter(&self, scene_id: &str, ctx: &mut Context) -> Result<bool> {
        Stage::enter(self, scene_id, ctx).await
    }

    async fn leave(&self, ctx: &mut Context) -> Result<bool> {
        Stage::leave(self, ctx).await
    }

    async fn reenter(&self, ctx: &mut Context) -> Result<bool> {
        Stage::reenter(self, ctx).await
    }
}

struct StageMiddleware {
    stage: Arc<Stage>,
}

#[async_trait]
impl Middleware for StageMiddleware {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<Flow> {
        ctx.set_scene_manager(self.stage.clone());
        if let Some(scene) = self.stage.current_scene(ctx)? {
            debug!(scene = %scene.id(), chat_id = %ctx.chat_id(), "step: scene owns update");
            scene.handle_update(ctx).await?;
            // The active scene claims the update exclusively; the rest of
            // the outer chain is not invoked.
            return Ok(Flow::Handled);
        }
        next.run(ctx).await
    }
}

struct SceneGate {
    stage: Arc<Stage>,
    scene_id: String,
}

#[async_trait]
impl Middleware for SceneGate {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<Flow> {
        let active = self
            .stage
            .current_scene(ctx)?
            .is_some_and(|scene| scene.id() == self.scene_id);
        if active {
            next.run(ctx).await
        } else {
            Ok(Flow::Continue)
        }
    }
}

/// Convenience wrapper pairing a Context with a Stage.
pub struct SceneContext<'a> {
    ctx: &'a mut Context,
    stage: &'a Stage,
}

impl<'a> SceneContext<'a> {
    pub fn new(ctx: &'a mut Context, stage: &'a Stage) -> Self {
        Self { ctx, stage }
    }

    pub async fn enter(&mut self, scene_id: &str) -> Result<bool> {
        self.stage.enter(scene_id, self.ctx).await
    }

    pub async fn leave(&mut self) -> Result<bool> {
        self.stage.leave(self.ctx).await
    }

    pub async fn reenter(&mut self) -> Result<bool> {
        self.stage.reenter(self.ctx).await
    }

    pub fn current(&self) -> Result<Option<Arc<dyn Scene>>> {
        self.stage.current_scene(self.ctx)
    }
}
