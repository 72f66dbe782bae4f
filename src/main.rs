use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use handwriting_bot::bot::{self, TelegramArchive};
use handwriting_bot::config::BotConfig;
use handwriting_bot::dialogue::{Command, Conversation, ConversationState};
use handwriting_bot::drive::GoogleDriveClient;
use handwriting_bot::messages::Messages;
use handwriting_bot::session::SessionStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    init_tracing();

    info!("Starting handwriting dataset bot");

    let config = BotConfig::from_env()?;
    info!(folder_id = %config.folder_id, archive = ?config.archive_chat, "Configuration loaded");

    let bot = Bot::new(&config.bot_token);
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }
    let telegram = Arc::new(TelegramArchive::new(bot.clone(), config.archive_chat.clone()));
    let drive = Arc::new(GoogleDriveClient::new(
        config.credentials.clone(),
        config.folder_id.clone(),
    ));
    let conversation = Arc::new(Conversation::new(
        SessionStore::new(),
        drive,
        telegram.clone(),
        telegram,
        Arc::new(Messages::new()?),
    ));

    let handler = Update::filter_message()
        .enter_dialogue::<Message, InMemStorage<ConversationState>, ConversationState>()
        .endpoint(bot::message_handler);

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![
            InMemStorage::<ConversationState>::new(),
            conversation
        ])
        .enable_ctrlc_handler()
        .build();

    match config.webhook {
        Some(webhook) => {
            info!(bind_addr = %webhook.bind_addr, "Serving webhook");
            let listener =
                webhooks::axum(bot, webhooks::Options::new(webhook.bind_addr, webhook.url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            info!("WEBHOOK_URL not set, falling back to long polling");
            bot.delete_webhook().await?;
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}
