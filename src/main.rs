// This is the entry point of the classroom chat bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic): validation, content filter,
//   moderation protocol, AI assistant, usage accounting
// - `infra/` = Implementations of core traits (SQLite stores, Gemini client)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::AppConfig;
use crate::core::ai::{AiConfig, AiService};
use crate::core::chat::ChatService;
use crate::core::moderation::{BannedTermService, ModerationService};
use crate::core::usage::UsageService;
use crate::discord::{Data, Error};
use crate::infra::ai::GeminiClient;
use crate::infra::chat::SqliteMessageStore;
use crate::infra::moderation::SqliteBannedTermStore;
use crate::infra::usage::SqliteUsageStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            // Ignore bot messages (including our own)
            if new_message.author.bot {
                return Ok(());
            }

            let bot_id = ctx.cache.current_user().id;
            if new_message.mentions.iter().any(|u| u.id == bot_id) {
                if let Err(e) = discord::ai::reply_to_mention(ctx, new_message, data).await {
                    tracing::error!("Failed to answer mention: {}", e);
                }
            }
        }
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("Connected as {}", data_about_bot.user.name);
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Reads `.env` (if it exists) and then the process environment.
    let config = AppConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let pool = infra::database::connect(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;
    infra::database::initialize(&pool)
        .await
        .context("Failed to create database schema")?;

    let message_store = SqliteMessageStore::new(pool.clone());
    let usage_store = SqliteUsageStore::new(pool.clone());

    let banned_terms = Arc::new(BannedTermService::new(SqliteBannedTermStore::new(
        pool.clone(),
    )));
    banned_terms
        .seed_if_empty()
        .await
        .context("Failed to seed banned terms")?;

    let chat_service = Arc::new(ChatService::new(
        message_store.clone(),
        Arc::clone(&banned_terms),
    ));
    let moderation_service = Arc::new(ModerationService::new(
        message_store,
        Arc::clone(&banned_terms),
        config.learn_on_block,
    ));

    let ai_config = AiConfig {
        model: config.gemini_model.clone(),
        temperature: 0.7,
        max_tokens: None,
        top_p: None,
    };
    let ai_service = Arc::new(AiService::new(
        GeminiClient::new(config.gemini_api_key.clone()),
        usage_store.clone(),
        ai_config,
    ));
    let usage_service = Arc::new(UsageService::new(usage_store));

    tracing::info!(
        database = %config.database_path,
        model = %config.gemini_model,
        learn_on_block = config.learn_on_block,
        "Services initialized"
    );

    // Create the data structure that will be shared across all commands
    let data = Data {
        chat: chat_service,
        moderation: moderation_service,
        banned_terms,
        ai: ai_service,
        usage: usage_service,
        teacher_role_id: config.teacher_role_id,
        ai_max_history: config.ai_max_history,
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::classroom::say(),
                discord::commands::classroom::history(),
                discord::moderation::moderation(),
                discord::commands::assistant::explain(),
                discord::commands::assistant::usage(),
                discord::commands::assistant::aistatus(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot is starting up...");

                // Global registration can take up to an hour to propagate.
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                tracing::info!("Commands registered, bot is ready");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
