use std::sync::Arc;

use chrono::Local;
use serde_json::json;
use tracing::info;
use wabot::{handler_fn, BotConfig, WhatsAppBot};
use scenes::{Scene, Stage, WizardScene};
use wabot_core::{init_tracing, SCENE_SESSION_KEY};

/// Two-step registration wizard: name, then age. Every plain message is
/// recorded against the current step; after the last answer the wizard
/// completes and the leave hook sends a summary.
fn registration_wizard() -> WizardScene {
    let mut wizard = WizardScene::new("registration");
    wizard
        .step(handler_fn(|ctx| {
            Box::pin(async move {
                ctx.reply("Welcome! What's your name?").await?;
                Ok(())
            })
        }))
        .step(handler_fn(|ctx| {
            Box::pin(async move {
                ctx.reply("How old are you?").await?;
                Ok(())
            })
        }));

    wizard.command(
        ["cancel"],
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.reply("Registration cancelled.").await?;
                ctx.leave_scene().await?;
                Ok(())
            })
        }),
    );

    // Record each answer against the step that asked for it.
    wizard.use_handler(handler_fn(|ctx| {
        Box::pin(async move {
            if let Some(text) = ctx.text().map(str::to_string) {
                if !text.starts_with('/') {
                    if let Some(wizard) = ctx.wizard.as_mut() {
                        wizard.next(Some(json!(text)));
                    }
                }
            }
            Ok(())
        })
    }));

    wizard.on_leave(handler_fn(|ctx| {
        Box::pin(async move {
            let wizard = ctx
                .session
                .get(SCENE_SESSION_KEY)
                .and_then(|record| record.pointer("/state/wizard"))
                .cloned()
                .unwrap_or_default();
            // Cancelled runs skip the summary.
            if wizard.get("completed").and_then(|v| v.as_bool()) != Some(true) {
                return Ok(());
            }
            let data = wizard.get("step_data").cloned().unwrap_or_default();
            let name = data.get("0").and_then(|v| v.as_str()).unwrap_or("?");
            let age = data.get("1").and_then(|v| v.as_str()).unwrap_or("?");
            ctx.reply(&format!("Registered: {name}, age {age}. Thanks!"))
                .await?;
            Ok(())
        })
    }));

    wizard
}

#[tokio::main]
async fn main() {
    let config = BotConfig::from_env().expect("Failed to load bot configuration");
    init_tracing(config.log_file.as_deref()).expect("Failed to initialize logging");

    let mut bot = WhatsAppBot::new(&config).expect("Failed to build bot");
    info!(
        start_time = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        instance = %config.id_instance,
        "Wizard Bot started"
    );

    let stage = Arc::new(Stage::new(vec![
        Arc::new(registration_wizard()) as Arc<dyn Scene>
    ]));
    bot.use_middleware(stage.middleware());

    bot.command(
        ["register"],
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.enter_scene("registration").await?;
                Ok(())
            })
        }),
    );
    bot.help(handler_fn(|ctx| {
        Box::pin(async move {
            ctx.reply("Send /register to sign up, /cancel to abort.")
                .await?;
            Ok(())
        })
    }));

    bot.start_polling().await;
}
