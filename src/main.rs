use std::path::PathBuf;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use jarvis_bot::preferences::JsonPreferenceStore;
use jarvis_bot::sms::mask_phones_in;
use jarvis_bot::telegram_log::TelegramLogLayer;
use jarvis_bot::{CommandRouter, Config, IncomingText};

type Router = CommandRouter<JsonPreferenceStore>;

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match Config::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "jarvis.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        registry.with(TelegramLogLayer::new(bot.clone(), log_chat_id)).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting Jarvis Bot...");
    if let Some(ref path) = config_path {
        info!("Loaded config from {}", path.display());
    }
    info!("Data directory: {}", config.data_dir.display());
    info!("Default SMS provider: {}", config.default_provider.display_name());

    let preferences = JsonPreferenceStore::load(&config.preferences_path());
    let router: Arc<Router> = Arc::new(CommandRouter::from_config(&config, preferences));

    register_commands(&bot).await;

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Publish the command menu shown by Telegram clients.
async fn register_commands(bot: &Bot) {
    let commands = vec![
        BotCommand::new("start", "Welcome message"),
        BotCommand::new("help", "Command reference"),
        BotCommand::new("health", "Integration status"),
        BotCommand::new("sms", "Send an SMS: /sms <phone> <message>"),
        BotCommand::new("call", "Start a voice call: /call <phone> [message]"),
        BotCommand::new("setlang", "Choose your language"),
        BotCommand::new("ai", "Ask the AI: /ai <question>"),
        BotCommand::new("stats", "Usage statistics"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("Failed to register command menu: {e}");
    }
}

async fn handle_message(bot: Bot, msg: Message, router: Arc<Router>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(ref user) = msg.from else {
        return Ok(());
    };

    let username = user
        .username
        .clone()
        .unwrap_or_else(|| user.first_name.clone());
    let incoming = IncomingText {
        user_id: user.id.0 as i64,
        username,
        text: text.to_string(),
    };

    // Keep phone numbers out of the logs
    let preview: String = mask_phones_in(text).chars().take(100).collect();
    info!("📨 {} ({}): \"{preview}\"", incoming.username, incoming.user_id);

    let reply = router.handle(&incoming).await;

    if let Err(e) = bot.send_message(msg.chat.id, reply).await {
        error!("Failed to send reply to {}: {e}", msg.chat.id);
    }

    Ok(())
}
