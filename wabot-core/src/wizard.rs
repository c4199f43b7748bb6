//! Wizard cursor attached to the Context while a wizard step handler runs.
//!
//! Navigation is deferred: a step handler records at most one
//! [`WizardAction`] on the cursor, and the wizard dispatcher applies it after
//! the handler returns. This keeps step handlers free of re-entrant calls
//! into the scene engine while preserving "the next step runs within the
//! same update" semantics.

use serde_json::{Map, Value};

/// Pending navigation recorded by a step handler.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    /// Record data for the current step, mark it complete, advance by one.
    /// Advancing past the last step completes the wizard.
    Next(Option<Value>),
    /// Step back by one and re-run that step. No-op at step 0.
    Previous,
    /// Move directly to the given step (bounds-checked by the dispatcher).
    JumpTo(usize),
    /// Mark the wizard completed and leave the scene.
    Complete,
}

/// Read view of the wizard state plus the pending-action slot.
///
/// `step_data` keys are step indices rendered as strings, matching the
/// persisted session layout.
#[derive(Debug, Clone)]
pub struct WizardControl {
    current_step: usize,
    total_steps: usize,
    step_data: Map<String, Value>,
    completed_steps: Vec<usize>,
    completed: bool,
    action: Option<WizardAction>,
}

/// Progress summary for a wizard session.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardProgress {
    pub current_step: usize,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub percentage: f64,
    pub completed: bool,
}

impl WizardControl {
    pub fn new(
        current_step: usize,
        total_steps: usize,
        step_data: Map<String, Value>,
        completed_steps: Vec<usize>,
        completed: bool,
    ) -> Self {
        Self {
            current_step,
            total_steps,
            step_data,
            completed_steps,
            completed,
            action: None,
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Data recorded for one step, if any.
    pub fn step_data(&self, index: usize) -> Option<&Value> {
        self.step_data.get(&index.to_string())
    }

    /// All data recorded so far, keyed by step index.
    pub fn get_all_data(&self) -> &Map<String, Value> {
        &self.step_data
    }

    pub fn progress(&self) -> WizardProgress {
        let completed_count = self.completed_steps.len();
        let percentage = if self.total_steps > 0 {
            completed_count as f64 / self.total_steps as f64 * 100.0
        } else {
            0.0
        };
        WizardProgress {
            current_step: self.current_step,
            total_steps: self.total_steps,
            completed_steps: completed_count,
            percentage,
            completed: self.completed,
        }
    }

    /// Record data for this step and advance. The following step handler
    /// runs within the same update; past the last step the wizard completes.
    pub fn next(&mut self, data: Option<Value>) {
        self.action = Some(WizardAction::Next(data));
    }

    pub fn previous(&mut self) {
        self.action = Some(WizardAction::Previous);
    }

    pub fn jump_to(&mut self, index: usize) {
        self.action = Some(WizardAction::JumpTo(index));
    }

    pub fn complete(&mut self) {
        self.action = Some(WizardAction::Complete);
    }

    /// Takes the pending action, leaving the slot empty. Used by the wizard
    /// dispatcher; a second call returns `None`.
    pub fn take_action(&mut self) -> Option<WizardAction> {
        self.action.take()
    }
}
