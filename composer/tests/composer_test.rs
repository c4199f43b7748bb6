//! Integration tests for [`composer::Composer`].
//!
//! Covers: command routing and argument parsing, compose associativity and
//! zero-handler no-op, first-match-only `hears`, update-class gating,
//! filter/drop gating, and the Handled/Continue signal from dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use composer::{compose, Composer, UpdateFilter};
use wabot_core::testing::{callback_update, text_update, RecordingApi};
use wabot_core::{handler_fn, Context, Flow, Handler};

fn text_ctx(text: &str) -> Context {
    Context::from_update(text_update("111@c.us", text), Arc::new(RecordingApi::new()))
}

fn counting_handler(count: &Arc<AtomicUsize>) -> Arc<dyn Handler> {
    let count = count.clone();
    handler_fn(move |_ctx| {
        let count = count.clone();
        Box::pin(async move {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
}

fn recording_handler(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Arc<dyn Handler> {
    let log = log.clone();
    handler_fn(move |_ctx| {
        let log = log.clone();
        Box::pin(async move {
            log.lock().unwrap().push(tag);
            Ok(())
        })
    })
}

/// **Test: `/name args` routes to the command handler with parsed name/args.**
///
/// **Setup:** Composer with `command(["greeting"])` capturing command and args.
/// **Action:** dispatch `/Greeting hello world`.
/// **Expected:** handler ran once; command is `greeting`; args split on whitespace.
#[tokio::test]
async fn test_command_routing_and_args() {
    let seen: Arc<Mutex<Option<(Option<String>, Vec<String>)>>> = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();
    let handler = handler_fn(move |ctx| {
        let seen = seen_clone.clone();
        Box::pin(async move {
            *seen.lock().unwrap() = Some((ctx.command(), ctx.command_args()));
            Ok(())
        })
    });

    let mut composer = Composer::new();
    composer.command(["greeting"], handler);

    let mut ctx = text_ctx("/Greeting hello world");
    let flow = composer.dispatch(&mut ctx).await.unwrap();

    assert_eq!(flow, Flow::Handled);
    let captured = seen.lock().unwrap().clone().unwrap();
    assert_eq!(captured.0.as_deref(), Some("greeting"));
    assert_eq!(captured.1, vec!["hello", "world"]);
}

/// **Test: command gate does not fire for other commands or plain text.**
#[tokio::test]
async fn test_command_no_match() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut composer = Composer::new();
    composer.command(["start"], counting_handler(&count));

    let mut ctx = text_ctx("/stop");
    assert_eq!(composer.dispatch(&mut ctx).await.unwrap(), Flow::Continue);
    let mut ctx = text_ctx("start");
    assert_eq!(composer.dispatch(&mut ctx).await.unwrap(), Flow::Continue);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

/// **Test: composition is associative and preserves registration order.**
///
/// **Setup:** handlers tagged a/b/c composed as `[a, [b, c]]`.
/// **Action:** run the composed handler.
/// **Expected:** execution order `a, b, c`, same as a flat composition.
#[tokio::test]
async fn test_compose_associativity() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let nested = compose(vec![
        recording_handler(&log, "a"),
        compose(vec![recording_handler(&log, "b"), recording_handler(&log, "c")]),
    ]);

    let mut ctx = text_ctx("anything");
    nested.handle(&mut ctx).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
}

/// **Test: composing zero handlers yields a no-op unit.**
#[tokio::test]
async fn test_compose_empty_is_noop() {
    let noop = compose(vec![]);
    let mut ctx = text_ctx("anything");
    noop.handle(&mut ctx).await.unwrap();
}

/// **Test: only the first matching hears pattern triggers execution.**
///
/// **Setup:** one gate with two patterns that both match the text.
/// **Action:** dispatch `hello there`.
/// **Expected:** handler ran once; the match records the first pattern.
#[tokio::test]
async fn test_hears_first_match_only() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut composer = Composer::new();
    composer
        .hears(["hello", "hel+o"], counting_handler(&count))
        .unwrap();

    let mut ctx = text_ctx("hello there");
    let flow = composer.dispatch(&mut ctx).await.unwrap();

    assert_eq!(flow, Flow::Handled);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.text_match.as_ref().unwrap().pattern, "hello");
}

/// **Test: hears exposes capture groups and matches case-insensitively.**
#[tokio::test]
async fn test_hears_captures() {
    let captured: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let captured_clone = captured.clone();
    let handler = handler_fn(move |ctx| {
        let captured = captured_clone.clone();
        Box::pin(async move {
            let name = ctx
                .text_match
                .as_ref()
                .and_then(|m| m.captures.first().cloned().flatten());
            *captured.lock().unwrap() = name;
            Ok(())
        })
    });

    let mut composer = Composer::new();
    composer.hears([r"my name is (\w+)"], handler).unwrap();

    let mut ctx = text_ctx("My name is Alice");
    composer.dispatch(&mut ctx).await.unwrap();
    assert_eq!(captured.lock().unwrap().as_deref(), Some("Alice"));
}

/// **Test: invalid hears pattern is a configuration error.**
#[test]
fn test_hears_invalid_pattern() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut composer = Composer::new();
    assert!(composer.hears(["("], counting_handler(&count)).is_err());
}

/// **Test: `on(Text)` requires non-empty text; `on(Message)` matches any message.**
#[tokio::test]
async fn test_on_update_classes() {
    let text_count = Arc::new(AtomicUsize::new(0));
    let message_count = Arc::new(AtomicUsize::new(0));
    let mut composer = Composer::new();
    composer.on([UpdateFilter::Text], counting_handler(&text_count));
    composer.on([UpdateFilter::Message], counting_handler(&message_count));

    // A media message carries no text.
    let media = serde_json::json!({
        "messageData": {
            "idMessage": "m1",
            "typeMessage": "imageMessage",
            "fileMessageData": {"downloadUrl": "http://x/y.jpg", "fileName": "y.jpg"}
        },
        "senderData": {"chatId": "111@c.us", "sender": "111@c.us"}
    });
    let mut ctx = Context::from_update(media, Arc::new(RecordingApi::new()));
    composer.dispatch(&mut ctx).await.unwrap();
    assert_eq!(text_count.load(Ordering::SeqCst), 0);
    assert_eq!(message_count.load(Ordering::SeqCst), 1);

    let mut ctx = text_ctx("words");
    composer.dispatch(&mut ctx).await.unwrap();
    assert_eq!(text_count.load(Ordering::SeqCst), 1);
    assert_eq!(message_count.load(Ordering::SeqCst), 2);
}

/// **Test: action gate matches callback data exactly.**
#[tokio::test]
async fn test_action_gate() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut composer = Composer::new();
    composer.action(["confirm"], counting_handler(&count));

    let mut ctx = Context::from_update(
        callback_update("111@c.us", "confirm"),
        Arc::new(RecordingApi::new()),
    );
    assert_eq!(composer.dispatch(&mut ctx).await.unwrap(), Flow::Handled);

    let mut ctx = Context::from_update(
        callback_update("111@c.us", "confirm-other"),
        Arc::new(RecordingApi::new()),
    );
    assert_eq!(composer.dispatch(&mut ctx).await.unwrap(), Flow::Continue);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

/// **Test: a matched gate is a tap — later units in the chain still run.**
#[tokio::test]
async fn test_gates_do_not_stop_the_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut composer = Composer::new();
    composer.command(["start"], recording_handler(&log, "command"));
    composer.use_handler(recording_handler(&log, "tap"));

    let mut ctx = text_ctx("/start");
    let flow = composer.dispatch(&mut ctx).await.unwrap();
    assert_eq!(flow, Flow::Handled);
    assert_eq!(*log.lock().unwrap(), vec!["command", "tap"]);
}

/// **Test: filter blocks continuation when the predicate is false; drop_if
/// blocks when it is true.**
#[tokio::test]
async fn test_filter_and_drop() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut composer = Composer::new();
    composer.filter(|ctx| ctx.text() == Some("pass"));
    composer.use_handler(counting_handler(&count));

    let mut ctx = text_ctx("blocked");
    composer.dispatch(&mut ctx).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);

    let mut ctx = text_ctx("pass");
    composer.dispatch(&mut ctx).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let dropped = Arc::new(AtomicUsize::new(0));
    let mut composer = Composer::new();
    composer.drop_if(|ctx| ctx.text().is_some_and(|t| t.contains("spam")));
    composer.use_handler(counting_handler(&dropped));

    let mut ctx = text_ctx("buy spam now");
    composer.dispatch(&mut ctx).await.unwrap();
    assert_eq!(dropped.load(Ordering::SeqCst), 0);

    let mut ctx = text_ctx("legit");
    composer.dispatch(&mut ctx).await.unwrap();
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
}

/// **Test: start/help sugar routes `/start` and `/help`.**
#[tokio::test]
async fn test_start_help_sugar() {
    let start_count = Arc::new(AtomicUsize::new(0));
    let help_count = Arc::new(AtomicUsize::new(0));
    let mut composer = Composer::new();
    composer.start(counting_handler(&start_count));
    composer.help(counting_handler(&help_count));

    let mut ctx = text_ctx("/start");
    composer.dispatch(&mut ctx).await.unwrap();
    let mut ctx = text_ctx("/HELP me");
    composer.dispatch(&mut ctx).await.unwrap();

    assert_eq!(start_count.load(Ordering::SeqCst), 1);
    assert_eq!(help_count.load(Ordering::SeqCst), 1);
}
