//! # wabot-core
//!
//! Core types and traits for the WhatsApp bot framework: [`Context`], the
//! chain primitives ([`Handler`], [`Middleware`], [`Next`], [`Flow`]), the
//! [`Api`] messaging abstraction, error types, and tracing initialization.
//! Transport-agnostic; used by composer, session, scenes, and the bot facade.

pub mod api;
pub mod context;
pub mod error;
pub mod handler;
pub mod logger;
pub mod testing;
pub mod types;
pub mod wizard;

pub use api::Api;
pub use context::{Context, SceneManager, SCENE_SESSION_KEY};
pub use error::{BotError, Result};
pub use handler::{handler_fn, BoxFuture, Flow, Handler, Middleware, Next};
pub use logger::init_tracing;
pub use types::{CallbackQuery, Contact, Message, Notification, TextMatch, UpdateKind};
pub use wizard::{WizardAction, WizardControl, WizardProgress};
