//! Scene engine: conversational modes layered on the session.
//!
//! A [`Stage`] registers named [`Scene`]s and installs a middleware that
//! routes every update of a conversation to its active scene. [`BaseScene`]
//! gives a scene its own private chain plus enter/leave hooks;
//! [`WizardScene`] turns a scene into an ordered step sequence.

pub mod base;
pub mod record;
pub mod stage;
pub mod wizard;

pub use base::{BaseScene, Scene};
pub use record::{SceneRecord, WizardState};
pub use stage::{SceneContext, Stage};
pub use wizard::WizardScene;
