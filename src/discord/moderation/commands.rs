// Teacher moderation slash commands.

use crate::core::chat::{LanguageCode, MessageId, ModerationUpdateRequest};
use crate::core::moderation::{ModerationError, ModerationVerdict};
use crate::discord::commands::classroom::autocomplete_language;
use crate::discord::formatting::{format_flags, message_embed, spoiler_list, truncate_chars};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

type Context<'a> = poise::Context<'a, Data, Error>;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum VerdictChoice {
    Allow,
    Review,
    Block,
}

impl From<VerdictChoice> for ModerationVerdict {
    fn from(value: VerdictChoice) -> Self {
        match value {
            VerdictChoice::Allow => ModerationVerdict::Allow,
            VerdictChoice::Review => ModerationVerdict::Review,
            VerdictChoice::Block => ModerationVerdict::Block,
        }
    }
}

/// Classroom moderation commands for teachers.
#[poise::command(
    slash_command,
    subcommands("show", "set", "words", "ban"),
    required_permissions = "MANAGE_MESSAGES",
    guild_only
)]
pub async fn moderation(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

/// Preview a stored message and its current moderation before changing it.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn show(
    ctx: Context<'_>,
    #[description = "Message ID (shown in the message footer)"] message_id: String,
) -> Result<(), Error> {
    let Some(id) = message_id_arg(&message_id) else {
        return Err(Error::from("Message ID must not be empty"));
    };

    let message = ctx
        .data()
        .chat
        .get(&id)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let reply = match message {
        Some(message) => {
            let hint = message.moderation.student_hint.as_deref().unwrap_or("none");
            let embed = message_embed(&message)
                .title("🔎 Classroom Message")
                .field("Verdict", message.moderation.verdict.to_string(), true)
                .field("Flags", format_flags(&message.moderation.flags), true)
                .field("Hint", hint, false);
            poise::CreateReply::default().embed(embed)
        }
        None => poise::CreateReply::default()
            .content(format!("❓ No classroom message with ID `{}`.", id)),
    };

    ctx.send(reply.ephemeral(true)).await?;
    Ok(())
}

/// Replace the moderation decision on a stored message.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn set(
    ctx: Context<'_>,
    #[description = "Message ID (shown in the message footer)"] message_id: String,
    #[description = "New verdict"] verdict: VerdictChoice,
    #[description = "Comma-separated flags, e.g. profanity,personal_info"] flags: Option<String>,
    #[description = "Hint shown to the student"] hint: Option<String>,
    #[description = "Comma-separated words to ban (block only; defaults to the whole message)"]
    words: Option<String>,
) -> Result<(), Error> {
    let request = ModerationUpdateRequest {
        message_id,
        verdict: ModerationVerdict::from(verdict).as_str().to_string(),
        flags: flags.as_deref().map(split_list).unwrap_or_default(),
        student_hint: hint,
        words_to_block: words.as_deref().map(split_list),
    };

    let (message_id, update) = request
        .validate()
        .map_err(|e| Error::from(e.to_string()))?;

    let outcome = match ctx
        .data()
        .moderation
        .update_moderation(&message_id, update)
        .await
    {
        Ok(outcome) => outcome,
        Err(ModerationError::NotFound(id)) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("❓ No classroom message with ID `{}`.", id))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
        Err(e) => return Err(Error::from(e.to_string())),
    };

    let moderation = &outcome.message.moderation;
    let mut embed = serenity::CreateEmbed::new()
        .title("🛡️ Moderation Updated")
        .description(truncate_chars(outcome.message.content.text(), 1000))
        .field("Verdict", moderation.verdict.to_string(), true)
        .field("Flags", format_flags(&moderation.flags), true)
        .field(
            "Hint",
            moderation.student_hint.as_deref().unwrap_or("none"),
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Message ID: {}",
            outcome.message.id
        )));

    if !outcome.learned_terms.is_empty() {
        embed = embed.field(
            format!("Banned ({})", outcome.message.language),
            spoiler_list(&outcome.learned_terms),
            false,
        );
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// List the banned terms for a language.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn words(
    ctx: Context<'_>,
    #[description = "Language code"]
    #[autocomplete = "autocomplete_language"]
    language: String,
) -> Result<(), Error> {
    let language: LanguageCode = language.parse().map_err(|e| Error::from(format!("{}", e)))?;

    let terms = ctx
        .data()
        .banned_terms
        .list_terms(language)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let listing = if terms.is_empty() {
        "No banned terms.".to_string()
    } else {
        truncate_chars(&spoiler_list(&terms), 4000)
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("🚫 Banned terms ({})", language))
        .description(listing)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "{} terms",
            terms.len()
        )));

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Add banned terms for a language.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Comma-separated words or phrases"] words: String,
    #[description = "Language code"]
    #[autocomplete = "autocomplete_language"]
    language: String,
) -> Result<(), Error> {
    let language: LanguageCode = language.parse().map_err(|e| Error::from(format!("{}", e)))?;

    let added = ctx
        .data()
        .banned_terms
        .add_terms(&split_list(&words), language)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    tracing::info!(
        language = %language,
        count = added.len(),
        by = %ctx.author().id,
        "Banned terms added"
    );

    let reply = if added.is_empty() {
        "Nothing to add.".to_string()
    } else {
        format!(
            "✅ Banned for `{}`: {}",
            language,
            truncate_chars(&spoiler_list(&added), 1800)
        )
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}

fn message_id_arg(raw: &str) -> Option<MessageId> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| MessageId::new(trimmed))
}

/// Split a comma-separated option into trimmed, non-empty items.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
