// Runtime configuration read from the environment (and `.env`, via dotenv).

use anyhow::{anyhow, Context as _};

pub const DEFAULT_DATABASE_PATH: &str = "data/chat.sqlite3";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_AI_MAX_HISTORY: u8 = 20;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord_token: String,
    pub database_path: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Whether blocking a message through `/moderation set` adds words to the banned list.
    pub learn_on_block: bool,
    /// Members holding this role post as teachers.
    pub teacher_role_id: Option<u64>,
    /// How many channel messages a mention reply looks back at.
    pub ai_max_history: u8,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| anyhow!("Missing {} environment variable", key))
        };

        let learn_on_block = match get("MODERATION_LEARN_ON_BLOCK") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| anyhow!("MODERATION_LEARN_ON_BLOCK must be true or false"))?,
            None => true,
        };

        let teacher_role_id = get("TEACHER_ROLE_ID")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("TEACHER_ROLE_ID must be a numeric role id")?;

        let ai_max_history = get("AI_MAX_HISTORY")
            .map(|v| v.parse::<u8>())
            .transpose()
            .context("AI_MAX_HISTORY must be between 1 and 100")?
            .unwrap_or(DEFAULT_AI_MAX_HISTORY);
        if !(1..=100).contains(&ai_max_history) {
            return Err(anyhow!("AI_MAX_HISTORY must be between 1 and 100"));
        }

        Ok(Self {
            discord_token: required("DISCORD_TOKEN")?,
            database_path: get("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            learn_on_block,
            teacher_role_id,
            ai_max_history,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
