//! # wabot
//!
//! WhatsApp bot facade over the SDKWA API: configuration, the bot type with
//! its registration surface and polling loop, re-exporting the pieces most
//! bots need from the underlying crates.

pub mod bot;
pub mod config;

pub use bot::{ErrorHandler, PollingOptions, WhatsAppBot};
pub use config::BotConfig;

pub use composer::{compose, Composer, UpdateFilter};
pub use session::{FileSessionStore, MemorySessionStore, SessionManager, SessionStore};
pub use wabot_core::{
    handler_fn, Api, BotError, Contact, Context, Flow, Handler, Message, Middleware, Result,
    UpdateKind,
};
