//! Session layer: per-conversation key-value state, loaded before and
//! persisted after each update's processing.
//!
//! ## Modules
//!
//! - [`store`] – SessionStore trait, in-memory and file-backed stores
//! - [`middleware`] – chain middleware with finally-style write-back
//! - [`manager`] – direct store access outside the chain

mod manager;
mod middleware;
mod store;

pub use manager::SessionManager;
pub use middleware::{session, session_with_store, KeyGenerator, SessionMiddleware};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
