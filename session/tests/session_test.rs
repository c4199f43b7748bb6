//! Integration tests for the session layer.
//!
//! Covers: round-trip across updates through the middleware, write-back on
//! handler failure, key derivation, and the file-backed store surviving a
//! reopen.

use std::sync::Arc;

use composer::Composer;
use serde_json::json;
use session::{FileSessionStore, MemorySessionStore, SessionManager, SessionMiddleware, SessionStore};
use wabot_core::testing::{text_update, RecordingApi};
use wabot_core::{handler_fn, BotError, Context, Handler};

fn ctx_for(chat_id: &str, text: &str) -> Context {
    Context::from_update(text_update(chat_id, text), Arc::new(RecordingApi::new()))
}

fn set_handler(key: &'static str, value: &'static str) -> Arc<dyn Handler> {
    handler_fn(move |ctx| {
        Box::pin(async move {
            ctx.session.insert(key.to_string(), json!(value));
            Ok(())
        })
    })
}

/// **Test: a session value written during one update is visible in the next
/// update for the same conversation.**
#[tokio::test]
async fn test_session_round_trip() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let mut composer = Composer::new();
    composer.use_middleware(Arc::new(SessionMiddleware::new(store.clone())));
    composer.use_handler(set_handler("name", "Alice"));

    let mut ctx = ctx_for("c1@c.us", "first");
    composer.dispatch(&mut ctx).await.unwrap();

    let mut composer2 = Composer::new();
    composer2.use_middleware(Arc::new(SessionMiddleware::new(store.clone())));
    let mut ctx2 = ctx_for("c1@c.us", "second");
    composer2.dispatch(&mut ctx2).await.unwrap();
    assert_eq!(ctx2.session.get("name"), Some(&json!("Alice")));

    // Different conversation, different session.
    let mut ctx3 = ctx_for("c2@c.us", "third");
    composer2.dispatch(&mut ctx3).await.unwrap();
    assert!(ctx3.session.get("name").is_none());
}

/// **Test: session mutations made before a handler error are persisted.**
///
/// **Setup:** chain writes a session key, then a handler fails.
/// **Action:** dispatch; expect an error.
/// **Expected:** the store holds the mutation written before the failure.
#[tokio::test]
async fn test_write_back_on_handler_error() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let mut composer = Composer::new();
    composer.use_middleware(Arc::new(SessionMiddleware::new(store.clone())));
    composer.use_handler(set_handler("progress", "half"));
    composer.use_handler(handler_fn(|_ctx| {
        Box::pin(async move { Err(BotError::Handler("boom".into())) })
    }));

    let mut ctx = ctx_for("c1@c.us", "hello");
    assert!(composer.dispatch(&mut ctx).await.is_err());

    let saved = store.get("c1@c.us").await.unwrap().unwrap();
    assert_eq!(saved.get("progress"), Some(&json!("half")));
}

/// **Test: conversations without a chat id fall back to the "default" key.**
#[tokio::test]
async fn test_default_key_for_unknown_updates() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let mut composer = Composer::new();
    composer.use_middleware(Arc::new(SessionMiddleware::new(store.clone())));
    composer.use_handler(set_handler("seen", "yes"));

    let mut ctx = Context::from_update(json!({"odd": true}), Arc::new(RecordingApi::new()));
    composer.dispatch(&mut ctx).await.unwrap();

    assert!(store.get("default").await.unwrap().is_some());
}

/// **Test: an injected key generator overrides conversation-id keying.**
#[tokio::test]
async fn test_custom_key_generator() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let middleware =
        SessionMiddleware::new(store.clone()).with_key_generator(|_ctx| "shared".to_string());
    let mut composer = Composer::new();
    composer.use_middleware(Arc::new(middleware));
    composer.use_handler(set_handler("k", "v"));

    let mut ctx = ctx_for("c1@c.us", "hello");
    composer.dispatch(&mut ctx).await.unwrap();
    assert!(store.get("shared").await.unwrap().is_some());
    assert!(store.get("c1@c.us").await.unwrap().is_none());
}

/// **Test: the file store persists sessions across a reopen; delete and
/// clear write through.**
#[tokio::test]
async fn test_file_store_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.json");

    {
        let store = FileSessionStore::new(&path);
        let mut data = serde_json::Map::new();
        data.insert("lang".to_string(), json!("en"));
        store.set("c1@c.us", data).await.unwrap();
    }

    let reopened = FileSessionStore::new(&path);
    let loaded = reopened.get("c1@c.us").await.unwrap().unwrap();
    assert_eq!(loaded.get("lang"), Some(&json!("en")));

    reopened.delete("c1@c.us").await.unwrap();
    assert!(reopened.get("c1@c.us").await.unwrap().is_none());

    let after_delete = FileSessionStore::new(&path);
    assert!(after_delete.get("c1@c.us").await.unwrap().is_none());
}

/// **Test: a corrupt session file starts an empty store instead of failing.**
#[tokio::test]
async fn test_file_store_tolerates_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = FileSessionStore::new(&path);
    assert!(store.get("c1@c.us").await.unwrap().is_none());
}

/// **Test: SessionManager clear_all empties the store.**
#[tokio::test]
async fn test_manager_clear_all() {
    let manager = SessionManager::in_memory();
    let mut data = serde_json::Map::new();
    data.insert("k".to_string(), json!(1));
    manager.set_session("c1@c.us", data).await.unwrap();
    assert!(!manager.get_session("c1@c.us").await.unwrap().is_empty());

    manager.clear_all().await.unwrap();
    assert!(manager.get_session("c1@c.us").await.unwrap().is_empty());
}
