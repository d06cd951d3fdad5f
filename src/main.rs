mod config;
mod journal;

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ChatKind;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use config::Config;
use journal::{prompts, Database, GeminiClient, Journal, Scheduler, Sweeper, TelegramClient, UserKey};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Journie understands these commands:")]
enum Command {
    #[command(description = "say hello.")]
    Start,
    #[command(description = "show this text.")]
    Help,
    #[command(description = "forget the current conversation.")]
    Clear,
    #[command(description = "summarize today's conversation now.")]
    Summarize,
}

struct BotState {
    journal: Arc<Journal>,
    telegram: TelegramClient,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "journie.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("journie.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file in {}: {e}", log_dir.display());
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
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
        )
        .init();

    info!("Starting journie...");
    info!("Loaded config from {config_path}");

    let database = match Database::open(&config.database_path()) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };
    let gemini = match GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.timezone,
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create Gemini client: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);
    let telegram = TelegramClient::new(bot.clone());
    let journal = Arc::new(Journal::new(gemini, database, config.timezone, config.history_limit));

    let sweeper = Arc::new(Sweeper::new(
        journal.clone(),
        Arc::new(telegram.clone()),
        config.sweep_settings(),
    ));
    let _scheduler = Scheduler::new(config.tick_schedule.clone(), config.tick_debounce, config.sweep_hours, sweeper).spawn();

    let state = Arc::new(BotState { journal, telegram });

    let handler = Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
        .branch(dptree::endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Key for the sender of a private message; group chats are ignored.
fn sender_key(msg: &Message) -> Option<UserKey> {
    if !matches!(msg.chat.kind, ChatKind::Private(_)) {
        return None;
    }
    let user = msg.from.as_ref()?;
    match UserKey::telegram(&user.id.to_string()) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!("Error handling user id {}: {}", user.id, e);
            None
        }
    }
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(key) = sender_key(&msg) else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;

    let reply = match cmd {
        Command::Start => {
            let username = msg
                .from
                .as_ref()
                .map(|u| u.username.clone().unwrap_or_else(|| u.first_name.clone()))
                .unwrap_or_default();
            prompts::welcome(&username)
        }
        Command::Help => Command::descriptions().to_string(),
        Command::Clear => {
            state.journal.clear(&key).await;
            "Chat session deleted".to_string()
        }
        Command::Summarize => {
            state.telegram.send_typing(chat_id).await;
            match state.journal.summarize_now(&key).await {
                Ok(entry) => match serde_json::to_string(&entry) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize entry for {}: {}", key, e);
                        "Error processing analysis".to_string()
                    }
                },
                Err(e) => {
                    warn!("Summarize failed for {}: {}", key, e);
                    e.user_message().to_string()
                }
            }
        }
    };

    state.telegram.send_message(chat_id, &reply).await.ok();
    Ok(())
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(key) = sender_key(&msg) else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;

    let reply = if let Some(text) = msg.text() {
        let preview: String = text.chars().take(100).collect();
        info!("Message from {}: \"{}\"", key, preview);

        state.telegram.send_typing(chat_id).await;
        match state.journal.reply(&key, text).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Reply failed for {}: {}", key, e);
                e.user_message().to_string()
            }
        }
    } else if msg.photo().is_some() {
        prompts::UNSUPPORTED_PHOTO.to_string()
    } else if msg.video().is_some() {
        prompts::UNSUPPORTED_VIDEO.to_string()
    } else if msg.voice().is_some() {
        prompts::UNSUPPORTED_VOICE.to_string()
    } else {
        return Ok(());
    };

    state.telegram.send_message(chat_id, &reply).await.ok();
    Ok(())
}
