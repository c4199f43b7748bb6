use std::sync::Arc;

use chrono::Local;
use tracing::info;
use wabot::{handler_fn, BotConfig, UpdateFilter, WhatsAppBot};
use scenes::{BaseScene, Scene, Stage};
use wabot_core::init_tracing;

/// Greeting scene: asks for a name, greets, and leaves.
fn greeting_scene() -> BaseScene {
    let mut scene = BaseScene::new("greeting");
    scene.on_enter(handler_fn(|ctx| {
        Box::pin(async move {
            ctx.reply("Hi! What's your name?").await?;
            Ok(())
        })
    }));
    scene.command(
        ["cancel"],
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.reply("Okay, maybe later.").await?;
                ctx.leave_scene().await?;
                Ok(())
            })
        }),
    );
    scene.on(
        [UpdateFilter::Text],
        handler_fn(|ctx| {
            Box::pin(async move {
                let name = ctx.text().unwrap_or("friend").to_string();
                ctx.reply(&format!("Nice to meet you, {name}!")).await?;
                ctx.leave_scene().await?;
                Ok(())
            })
        }),
    );
    scene
}

#[tokio::main]
async fn main() {
    let config = BotConfig::from_env().expect("Failed to load bot configuration");
    init_tracing(config.log_file.as_deref()).expect("Failed to initialize logging");

    let mut bot = WhatsAppBot::new(&config).expect("Failed to build bot");
    info!(
        start_time = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        instance = %config.id_instance,
        "Scene Bot started"
    );

    let stage = Arc::new(Stage::new(vec![
        Arc::new(greeting_scene()) as Arc<dyn Scene>
    ]));
    bot.use_middleware(stage.middleware());

    bot.command(
        ["greeting"],
        handler_fn(|ctx| {
            Box::pin(async move {
                ctx.enter_scene("greeting").await?;
                Ok(())
            })
        }),
    );
    bot.help(handler_fn(|ctx| {
        Box::pin(async move {
            ctx.reply("Send /greeting to start a conversation, /cancel to stop it.")
                .await?;
            Ok(())
        })
    }));

    bot.start_polling().await;
}
