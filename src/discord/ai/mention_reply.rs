// Streamed assistant replies when the bot is mentioned.
//
// Recent channel messages become the conversation history. The reply is
// posted right away as a placeholder and edited as text arrives, at most
// once per EDIT_INTERVAL to stay inside Discord's rate limits.

use crate::core::ai::AiMessage;
use crate::discord::formatting::{split_for_discord, truncate_chars, DISCORD_MESSAGE_LIMIT};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const EDIT_INTERVAL: Duration = Duration::from_millis(1200);
const PLACEHOLDER: &str = "💭 …";
const FAILURE_REPLY: &str = "Sorry, I encountered an error processing your request.";

const SYSTEM_PROMPT: &str = "You are a friendly teaching assistant in a language-learning \
    classroom chat. Keep answers short, encouraging and appropriate for students. Reply in \
    the language the student is using.";

/// One channel message as the assistant should see it.
#[derive(Debug, Clone)]
pub struct ChannelLine {
    pub from_bot: bool,
    pub author: String,
    pub content: String,
}

/// Turn channel lines (oldest first) into a conversation for the model.
///
/// Consecutive turns from the same side are merged and the conversation
/// always opens with a user turn.
pub fn build_history(lines: &[ChannelLine]) -> Vec<AiMessage> {
    let mut history = vec![AiMessage::system(SYSTEM_PROMPT)];

    for line in lines {
        let content = line.content.trim();
        if content.is_empty() {
            continue;
        }
        let (role, content) = if line.from_bot {
            ("assistant", content.to_string())
        } else {
            ("user", format!("{}: {}", line.author, content))
        };

        // Nothing for the assistant to continue from yet.
        if role == "assistant" && history.len() == 1 {
            continue;
        }

        match history.last_mut() {
            Some(last) if last.role == role => {
                last.content.push('\n');
                last.content.push_str(&content);
                continue;
            }
            _ => {}
        }
        history.push(AiMessage {
            role: role.to_string(),
            content,
        });
    }

    history
}

/// Remove `<@id>` / `<@!id>` mention tokens for the bot.
pub fn strip_mention(content: &str, bot_id: u64) -> String {
    content
        .replace(&format!("<@{}>", bot_id), "")
        .replace(&format!("<@!{}>", bot_id), "")
        .trim()
        .to_string()
}

/// Answer a message that mentions the bot with a streamed AI reply.
pub async fn reply_to_mention(
    ctx: &serenity::Context,
    new_message: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    let bot_id = ctx.cache.current_user().id;
    let _ = new_message.channel_id.broadcast_typing(&ctx.http).await;

    // The latest page already includes the mention itself.
    let recent = new_message
        .channel_id
        .messages(
            &ctx.http,
            serenity::GetMessages::new().limit(data.ai_max_history),
        )
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to fetch channel history: {}", e);
            vec![new_message.clone()]
        });

    let lines: Vec<ChannelLine> = recent
        .iter()
        .rev()
        .filter(|m| m.author.id == bot_id || !m.author.bot)
        .map(|m| ChannelLine {
            from_bot: m.author.id == bot_id,
            author: m.author.name.clone(),
            content: strip_mention(&m.content, bot_id.get()),
        })
        .collect();
    let history = build_history(&lines);
    if !history.iter().any(|m| m.role == "user") {
        return Ok(());
    }

    let mut reply = new_message.reply(&ctx.http, PLACEHOLDER).await?;

    let (tx, mut rx) = mpsc::channel::<String>(64);
    let ai = Arc::clone(&data.ai);
    let generation = tokio::spawn(async move { ai.chat_stream(&history, tx).await });

    let mut shown = String::new();
    let mut last_edit = Instant::now();
    while let Some(delta) = rx.recv().await {
        shown.push_str(&delta);
        if last_edit.elapsed() >= EDIT_INTERVAL {
            let preview = truncate_chars(&shown, DISCORD_MESSAGE_LIMIT);
            if let Err(e) = reply
                .edit(ctx, serenity::EditMessage::new().content(preview))
                .await
            {
                tracing::warn!("Failed to update streamed reply: {}", e);
            }
            last_edit = Instant::now();
        }
    }

    let result = match generation.await {
        Ok(result) => result,
        Err(join_error) => Err(join_error.to_string().into()),
    };

    match result {
        Ok(full) if !full.trim().is_empty() => {
            let mut chunks = split_for_discord(&full, DISCORD_MESSAGE_LIMIT).into_iter();
            if let Some(first) = chunks.next() {
                reply
                    .edit(ctx, serenity::EditMessage::new().content(first))
                    .await?;
            }
            for chunk in chunks {
                new_message.channel_id.say(&ctx.http, chunk).await?;
            }
        }
        Ok(_) => {
            reply
                .edit(ctx, serenity::EditMessage::new().content(FAILURE_REPLY))
                .await?;
        }
        Err(e) => {
            tracing::error!("AI error: {}", e);
            reply
                .edit(ctx, serenity::EditMessage::new().content(FAILURE_REPLY))
                .await?;
        }
    }

    Ok(())
}
