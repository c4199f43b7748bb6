//! Wizard scene: an ordered sequence of step handlers.
//!
//! Step handlers navigate by recording an action on `ctx.wizard`; the
//! dispatcher here applies it after the handler returns, running the target
//! step within the same update. A plain (non-command) message that no
//! scene-private handler claims advances the cursor by one; advancing past
//! the last step completes the wizard and leaves the scene.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use composer::UpdateFilter;
use wabot_core::{
    Context, Flow, Handler, Middleware, Result, WizardAction, WizardControl, WizardProgress,
};

use crate::base::{BaseScene, Scene};
use crate::record::WizardState;

const WIZARD_STATE_KEY: &str = "wizard";

/// Scene whose update handling is an ordered list of steps.
pub struct WizardScene {
    base: BaseScene,
    steps: Vec<Arc<dyn Handler>>,
}

impl WizardScene {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            base: BaseScene::new(id),
            steps: Vec::new(),
        }
    }

    /// Appends a step. Steps run in registration order.
    pub fn step(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.steps.push(handler);
        self
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn on_enter(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.base.on_enter(handler);
        self
    }

    pub fn on_leave(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.base.on_leave(handler);
        self
    }

    pub fn with_ttl(&mut self, seconds: f64) -> &mut Self {
        self.base.with_ttl(seconds);
        self
    }

    // Scene-private registration; these handlers run before the step
    // dispatcher and can claim the update (e.g. a /cancel command).

    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.base.use_middleware(middleware);
        self
    }

    pub fn use_handler(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.base.use_handler(handler);
        self
    }

    pub fn on(
        &mut self,
        filters: impl IntoIterator<Item = UpdateFilter>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.base.on(filters, handler);
        self
    }

    pub fn hears(
        &mut self,
        patterns: impl IntoIterator<Item = impl AsRef<str>>,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self> {
        self.base.hears(patterns, handler)?;
        Ok(self)
    }

    pub fn command(
        &mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.base.command(names, handler);
        self
    }

    pub fn action(
        &mut self,
        triggers: impl IntoIterator<Item = impl Into<String>>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.base.action(triggers, handler);
        self
    }

    // Read-only views of the persisted cursor for this conversation.

    pub fn current_step_index(&self, ctx: &Context) -> usize {
        self.wizard_state(ctx).current_step
    }

    pub fn is_completed(&self, ctx: &Context) -> bool {
        self.wizard_state(ctx).completed
    }

    pub fn progress(&self, ctx: &Context) -> WizardProgress {
        self.control_for(ctx).progress()
    }

    pub fn all_data(&self, ctx: &Context) -> Map<String, Value> {
        self.wizard_state(ctx).step_data
    }

    pub fn step_data(&self, ctx: &Context, index: usize) -> Option<Value> {
        self.wizard_state(ctx)
            .step_data
            .get(&index.to_string())
            .cloned()
    }

    fn wizard_state(&self, ctx: &Context) -> WizardState {
        self.base
            .state(ctx)
            .get(WIZARD_STATE_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    fn save_wizard_state(&self, ctx: &mut Context, state: &WizardState) -> Result<()> {
        let mut updates = Map::new();
        updates.insert(WIZARD_STATE_KEY.to_string(), serde_json::to_value(state)?);
        self.base.update_state(ctx, updates)
    }

    fn control_for(&self, ctx: &Context) -> WizardControl {
        let state = self.wizard_state(ctx);
        WizardControl::new(
            state.current_step,
            self.steps.len(),
            state.step_data,
            state.completed_steps,
            state.completed,
        )
    }

    fn attach_cursor(&self, ctx: &mut Context) {
        ctx.wizard = Some(self.control_for(ctx));
    }

    fn take_recorded_action(&self, ctx: &mut Context) -> Option<WizardAction> {
        let action = ctx.wizard.as_mut().and_then(WizardControl::take_action);
        ctx.wizard = None;
        action
    }

    /// Applies a recorded navigation to the persisted cursor. Returns the
    /// step index to run next, or `None` when the dispatcher should stop
    /// (stay put, out-of-range jump, or wizard completion).
    async fn apply(&self, ctx: &mut Context, action: WizardAction) -> Result<Option<usize>> {
        let mut state = self.wizard_state(ctx);
        let index = state.current_step;
        match action {
            WizardAction::Next(data) => {
                if let Some(data) = data {
                    state.step_data.insert(index.to_string(), data);
                }
                if !state.completed_steps.contains(&index) {
                    state.completed_steps.push(index);
                }
                state.current_step = index + 1;
                self.save_wizard_state(ctx, &state)?;
                if state.current_step < self.steps.len() {
                    Ok(Some(state.current_step))
                } else {
                    self.complete_wizard(ctx).await?;
                    Ok(None)
                }
            }
            WizardAction::Previous => {
                if index == 0 {
                    return Ok(None);
                }
                state.current_step = index - 1;
                self.save_wizard_state(ctx, &state)?;
                Ok(Some(state.current_step))
            }
            WizardAction::JumpTo(target) => {
                if target >= self.steps.len() {
                    warn!(
                        scene = %self.base.id(),
                        target,
                        steps = self.steps.len(),
                        "wizard jump out of range, staying put"
                    );
                    return Ok(None);
                }
                state.current_step = target;
                self.save_wizard_state(ctx, &state)?;
                Ok(Some(target))
            }
            WizardAction::Complete => {
                self.complete_wizard(ctx).await?;
                Ok(None)
            }
        }
    }

    /// Runs the step at `index`, then keeps applying recorded navigations
    /// until a step records none (or the wizard completes). All of this
    /// happens within the current update.
    async fn run_step(&self, ctx: &mut Context, mut index: usize) -> Result<()> {
        loop {
            let Some(step) = self.steps.get(index).cloned() else {
                self.complete_wizard(ctx).await?;
                break;
            };
            debug!(scene = %self.base.id(), step = index, "step: wizard step");
            self.attach_cursor(ctx);
            step.handle(ctx).await?;
            match self.take_recorded_action(ctx) {
                Some(action) => match self.apply(ctx, action).await? {
                    Some(next) => index = next,
                    None => break,
                },
                None => break,
            }
        }
        ctx.wizard = None;
        Ok(())
    }

    /// Marks the wizard completed, then leaves the scene.
    async fn complete_wizard(&self, ctx: &mut Context) -> Result<()> {
        let mut state = self.wizard_state(ctx);
        state.completed = true;
        self.save_wizard_state(ctx, &state)?;
        debug!(scene = %self.base.id(), chat_id = %ctx.chat_id(), "step: wizard complete");
        self.base.leave_scene(ctx).await
    }

    /// A plain message that no scene-private handler claimed moves the
    /// cursor forward. Commands never auto-advance.
    fn auto_advance_applies(&self, ctx: &Context) -> bool {
        ctx.message.is_some() && ctx.command().is_none()
    }
}

#[async_trait]
impl Scene for WizardScene {
    fn id(&self) -> &str {
        self.base.id()
    }

    fn ttl(&self) -> Option<f64> {
        self.base.ttl()
    }

    async fn enter_scene(&self, ctx: &mut Context) -> Result<()> {
        self.base.enter_scene(ctx).await?;
        self.save_wizard_state(ctx, &WizardState::default())?;
        if self.steps.is_empty() {
            self.complete_wizard(ctx).await
        } else {
            self.run_step(ctx, 0).await
        }
    }

    async fn leave_scene(&self, ctx: &mut Context) -> Result<()> {
        self.base.leave_scene(ctx).await
    }

    async fn handle_update(&self, ctx: &mut Context) -> Result<Flow> {
        self.attach_cursor(ctx);
        let flow = self.base.handle_update(ctx).await?;
        let action = self.take_recorded_action(ctx);

        // A scene-private handler may have left (or switched) the scene.
        if !self.base.is_active(ctx) {
            return Ok(Flow::Handled);
        }

        if let Some(action) = action {
            if let Some(next) = self.apply(ctx, action).await? {
                self.run_step(ctx, next).await?;
            }
            return Ok(Flow::Handled);
        }

        if flow == Flow::Continue && self.auto_advance_applies(ctx) {
            let state = self.wizard_state(ctx);
            if !state.completed {
                if let Some(next) = self.apply(ctx, WizardAction::Next(None)).await? {
                    self.run_step(ctx, next).await?;
                }
            }
        }
        Ok(Flow::Handled)
    }
}
