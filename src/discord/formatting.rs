//! Rendering helpers shared by the classroom, moderation and assistant commands.

use crate::core::chat::Message;
use crate::core::moderation::{ModerationFlag, ModerationVerdict};
use poise::serenity_prelude::{self as serenity, CreateEmbed, CreateEmbedFooter};

/// Discord's hard limit for a plain message body.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Split `text` into pieces of at most `limit` characters, preferring to
/// break at a newline, then at a space.
pub fn split_for_discord(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > limit {
        let hard_end = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..hard_end];
        let end = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(hard_end);

        chunks.push(rest[..end].to_string());
        rest = rest[end..].trim_start_matches(&['\n', ' '][..]);
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// Cut `text` to `limit` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub fn format_flags(flags: &[ModerationFlag]) -> String {
    if flags.is_empty() {
        return "none".to_string();
    }
    flags
        .iter()
        .map(|f| format!("`{}`", f))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Banned terms are hidden behind spoiler tags.
pub fn spoiler_list(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| format!("||{}||", t))
        .collect::<Vec<_>>()
        .join(", ")
}

fn verdict_color(verdict: ModerationVerdict) -> serenity::Color {
    match verdict {
        ModerationVerdict::Allow => serenity::Color::from_rgb(0, 200, 120),
        ModerationVerdict::Review => serenity::Color::from_rgb(255, 165, 0),
        ModerationVerdict::Block => serenity::Color::from_rgb(220, 50, 50),
    }
}

/// Embed echoing a posted classroom message.
pub fn message_embed(message: &Message) -> CreateEmbed {
    CreateEmbed::default()
        .description(message.content.text())
        .color(verdict_color(message.moderation.verdict))
        .field("Author", format!("<@{}> ({})", message.author_id, message.author_role), true)
        .field(
            "Course",
            format!("{} · {}", message.course_id, message.language),
            true,
        )
        .footer(CreateEmbedFooter::new(format!("Message ID: {}", message.id)))
        .timestamp(
            serenity::Timestamp::from_unix_timestamp(message.created_at.timestamp())
                .unwrap_or_else(|_| serenity::Timestamp::now()),
        )
}

/// One history line. Messages a teacher later blocked are not shown in full.
pub fn history_line(message: &Message) -> String {
    let time = message.created_at.format("%Y-%m-%d %H:%M");
    let body = match message.moderation.verdict {
        ModerationVerdict::Block => "*[removed by a teacher]*".to_string(),
        _ => truncate_chars(message.content.text(), 300),
    };
    let marker = match message.moderation.verdict {
        ModerationVerdict::Review => " ⚠️",
        _ => "",
    };
    format!(
        "`{}` <@{}> [{}]{}: {}",
        time, message.author_id, message.language, marker, body
    )
}
