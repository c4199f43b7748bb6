use chrono::Local;
use tracing::info;
use wabot::{handler_fn, BotConfig, UpdateFilter, WhatsAppBot};
use wabot_core::init_tracing;

#[tokio::main]
async fn main() {
    let config = BotConfig::from_env().expect("Failed to load bot configuration");
    init_tracing(config.log_file.as_deref()).expect("Failed to initialize logging");

    let mut bot = WhatsAppBot::new(&config).expect("Failed to build bot");
    info!(
        start_time = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        instance = %config.id_instance,
        "Echo Bot started"
    );

    bot.start(handler_fn(|ctx| {
        Box::pin(async move {
            ctx.reply("Hi! Send me any message and I'll echo it back.")
                .await?;
            Ok(())
        })
    }));

    bot.on(
        [UpdateFilter::Text],
        handler_fn(|ctx| {
            Box::pin(async move {
                if let Some(text) = ctx.text().map(str::to_string) {
                    info!(chat_id = %ctx.chat_id(), message_content = %text, "Echoing message");
                    ctx.reply(&format!("Echo: {text}")).await?;
                }
                Ok(())
            })
        }),
    );

    bot.start_polling().await;
}
