// AI assistant commands: block explanations, usage totals and a health check.

use super::classroom::{autocomplete_language, Context, Error};
use crate::core::chat::LanguageCode;
use crate::discord::formatting::{split_for_discord, truncate_chars, DISCORD_MESSAGE_LIMIT};
use poise::serenity_prelude as serenity;

/// Ask the assistant why a message would be blocked.
#[poise::command(slash_command)]
pub async fn explain(
    ctx: Context<'_>,
    #[description = "The message that was blocked"] text: String,
    #[description = "Language for the explanation (default en)"]
    #[autocomplete = "autocomplete_language"]
    language: Option<String>,
) -> Result<(), Error> {
    let language = match language {
        Some(raw) => raw
            .parse::<LanguageCode>()
            .map_err(|e| Error::from(format!("{}", e)))?,
        None => LanguageCode::En,
    };

    // Generation can take longer than Discord's 3 second window.
    ctx.defer_ephemeral().await?;

    let explanation = ctx
        .data()
        .ai
        .explain_block(&text, language)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    for chunk in split_for_discord(&explanation, DISCORD_MESSAGE_LIMIT) {
        ctx.send(poise::CreateReply::default().content(chunk).ephemeral(true))
            .await?;
    }
    Ok(())
}

/// Show how much the AI assistant has been used.
#[poise::command(slash_command, required_permissions = "MANAGE_MESSAGES")]
pub async fn usage(ctx: Context<'_>) -> Result<(), Error> {
    let totals = ctx
        .data()
        .usage
        .totals()
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let embed = serenity::CreateEmbed::new()
        .title("📈 AI Usage")
        .color(serenity::Color::BLUE)
        .field("Requests", totals.total_requests.to_string(), true)
        .field("Input tokens", totals.input_tokens.to_string(), true)
        .field("Output tokens", totals.output_tokens.to_string(), true)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Model: {}",
            ctx.data().ai.model()
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Check that the AI assistant is reachable.
#[poise::command(slash_command)]
pub async fn aistatus(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let reply = match ctx.data().ai.ping().await {
        Ok(answer) => format!("✅ Success: {}", answer),
        Err(e) => {
            tracing::warn!("AI health check failed: {}", e);
            format!("❌ Error: {}", e)
        }
    };

    ctx.say(truncate_chars(&reply, DISCORD_MESSAGE_LIMIT)).await?;
    Ok(())
}
