// Discord commands for the classroom chat.
//
// A Discord channel is a classroom. The pattern matches every command file:
// 1. Extract primitive data from Discord types
// 2. Call the core service
// 3. Format the response based on the result
//
// Validation and moderation live in core; this layer only translates.

use crate::core::ai::AiService;
use crate::core::chat::{
    ChatService, CourseId, CreateMessageRequest, LanguageCode, ListMessagesQuery, Role,
    SubmitOutcome,
};
use crate::core::moderation::{BannedTermService, ModerationService};
use crate::core::usage::UsageService;
use crate::discord::formatting::{
    format_flags, history_line, message_embed, split_for_discord, DISCORD_MESSAGE_LIMIT,
};
use crate::infra::ai::GeminiClient;
use crate::infra::chat::SqliteMessageStore;
use crate::infra::moderation::SqliteBannedTermStore;
use crate::infra::usage::SqliteUsageStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to every command and event handler.
pub struct Data {
    pub chat: Arc<ChatService<SqliteMessageStore, SqliteBannedTermStore>>,
    pub moderation: Arc<ModerationService<SqliteMessageStore, SqliteBannedTermStore>>,
    pub banned_terms: Arc<BannedTermService<SqliteBannedTermStore>>,
    pub ai: Arc<AiService<GeminiClient, SqliteUsageStore>>,
    pub usage: Arc<UsageService<SqliteUsageStore>>,
    /// Members holding this role post as teachers.
    pub teacher_role_id: Option<u64>,
    /// Channel messages fed to the assistant when it is mentioned.
    pub ai_max_history: u8,
}

/// Post a message to this channel's classroom chat.
#[poise::command(slash_command, guild_only)]
pub async fn say(
    ctx: Context<'_>,
    #[description = "What you want to say (max 500 characters)"] text: String,
    #[description = "Course this message belongs to"]
    #[autocomplete = "autocomplete_course"]
    course: String,
    #[description = "Language of the message (defaults to the course language)"]
    #[autocomplete = "autocomplete_language"]
    language: Option<String>,
) -> Result<(), Error> {
    let role = author_role(ctx).await;

    let request = CreateMessageRequest {
        classroom_id: ctx.channel_id().to_string(),
        course_id: course,
        language,
        author_id: ctx.author().id.to_string(),
        author_role: role.as_str().to_string(),
        text,
    };

    let outcome = ctx
        .data()
        .chat
        .submit(request)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    match outcome {
        SubmitOutcome::Posted(message) => {
            ctx.send(poise::CreateReply::default().embed(message_embed(&message)))
                .await?;
        }
        SubmitOutcome::Rejected(moderation) => {
            let hint = moderation.student_hint.as_deref().unwrap_or_default();
            ctx.send(
                poise::CreateReply::default()
                    .content(format!(
                        "🚫 Your message was not posted. {}\nFlags: {}\n\
                         Use `/explain` if you want to know why.",
                        hint,
                        format_flags(&moderation.flags)
                    ))
                    .ephemeral(true),
            )
            .await?;
        }
    }

    Ok(())
}

/// Show recent messages of this channel's classroom, oldest first.
#[poise::command(slash_command, guild_only)]
pub async fn history(
    ctx: Context<'_>,
    #[description = "How many messages to show (default 50, max 200)"] limit: Option<i64>,
) -> Result<(), Error> {
    let classroom = ctx.channel_id().to_string();
    let query = ListMessagesQuery::parse(Some(&classroom), limit)
        .map_err(|e| Error::from(e.to_string()))?;

    let messages = ctx
        .data()
        .chat
        .history(&query)
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    if messages.is_empty() {
        ctx.say("No classroom messages here yet.").await?;
        return Ok(());
    }

    let listing = messages
        .iter()
        .map(history_line)
        .collect::<Vec<_>>()
        .join("\n");

    for chunk in split_for_discord(&listing, DISCORD_MESSAGE_LIMIT) {
        ctx.send(
            poise::CreateReply::default()
                .content(chunk)
                .allowed_mentions(serenity::CreateAllowedMentions::new()),
        )
        .await?;
    }

    Ok(())
}

/// Resolve whether the invoking member posts as a teacher.
async fn author_role(ctx: Context<'_>) -> Role {
    let Some(teacher_role) = ctx.data().teacher_role_id else {
        return Role::Student;
    };
    let roles: Vec<u64> = match ctx.author_member().await {
        Some(member) => member.roles.iter().map(|r| r.get()).collect(),
        None => Vec::new(),
    };
    resolve_role(Some(teacher_role), &roles)
}

/// Teacher if the member holds the configured teacher role, student otherwise.
pub fn resolve_role(teacher_role_id: Option<u64>, member_roles: &[u64]) -> Role {
    match teacher_role_id {
        Some(id) if member_roles.contains(&id) => Role::Teacher,
        _ => Role::Student,
    }
}

fn matching(options: &[&'static str], partial: &str) -> Vec<String> {
    let partial = partial.to_lowercase();
    options
        .iter()
        .filter(|option| option.contains(partial.as_str()))
        .map(|option| option.to_string())
        .collect()
}

/// Autocomplete function for course ids
pub async fn autocomplete_course<'a>(
    _ctx: Context<'_>,
    partial: &'a str,
) -> impl Iterator<Item = String> + 'a {
    let courses: Vec<&'static str> = CourseId::ALL.iter().map(|c| c.as_str()).collect();
    matching(&courses, partial).into_iter()
}

/// Autocomplete function for language codes
pub async fn autocomplete_language<'a>(
    _ctx: Context<'_>,
    partial: &'a str,
) -> impl Iterator<Item = String> + 'a {
    let languages: Vec<&'static str> = LanguageCode::ALL.iter().map(|l| l.as_str()).collect();
    matching(&languages, partial).into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_role() {
        assert_eq!(resolve_role(None, &[1, 2]), Role::Student);
        assert_eq!(resolve_role(Some(7), &[1, 2]), Role::Student);
        assert_eq!(resolve_role(Some(2), &[1, 2]), Role::Teacher);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let courses: Vec<&'static str> = CourseId::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(matching(&courses, "SPA"), vec!["spanish"]);
        assert_eq!(matching(&courses, "").len(), CourseId::ALL.len());
        assert!(matching(&courses, "klingon").is_empty());
    }
}
