// Moderation domain models - verdicts, flags and the banned-term seed table.
//
// These are pure domain types with no Discord dependencies.

use crate::core::chat::chat_models::wire_enum;
use crate::core::chat::LanguageCode;
use serde::{Deserialize, Serialize};

/// Hint shown when a message contains personal information.
pub const PERSONAL_INFO_HINT: &str = "Please remove personal information and try again.";

/// Hint shown for every other blocked message.
pub const LANGUAGE_HINT: &str = "Please use classroom-appropriate language and try again.";

wire_enum!(
    /// Outcome of classifying a message.
    ModerationVerdict, "verdict" {
        Allow => "allow",
        Block => "block",
        Review => "review",
    }
);

wire_enum!(
    /// Reason category attached to a non-allow verdict.
    ModerationFlag, "flag" {
        Profanity => "profanity",
        Harassment => "harassment",
        Sexual => "sexual",
        SelfHarm => "self_harm",
        PersonalInfo => "personal_info",
        Spam => "spam",
    }
);

/// Verdict, flags and optional author hint for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    pub verdict: ModerationVerdict,
    pub flags: Vec<ModerationFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_hint: Option<String>,
}

impl ModerationResult {
    /// A clean result: no flags, no hint.
    pub fn allow() -> Self {
        Self {
            verdict: ModerationVerdict::Allow,
            flags: Vec::new(),
            student_hint: None,
        }
    }

    /// Derive the verdict and hint from a set of flags.
    ///
    /// Empty flags allow the message. Any flag blocks it, and personal
    /// information takes precedence when choosing the hint.
    pub fn from_flags(flags: Vec<ModerationFlag>) -> Self {
        if flags.is_empty() {
            return Self::allow();
        }

        let hint = if flags.contains(&ModerationFlag::PersonalInfo) {
            PERSONAL_INFO_HINT
        } else {
            LANGUAGE_HINT
        };

        Self {
            verdict: ModerationVerdict::Block,
            flags,
            student_hint: Some(hint.to_string()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.verdict == ModerationVerdict::Allow
    }
}

/// A human-chosen moderation result for a stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationUpdate {
    pub verdict: ModerationVerdict,
    pub flags: Vec<ModerationFlag>,
    pub student_hint: Option<String>,
    /// Explicit words to ban. When empty, a block bans the message text.
    pub words_to_block: Vec<String>,
}

impl ModerationUpdate {
    pub fn result(&self) -> ModerationResult {
        ModerationResult {
            verdict: self.verdict,
            flags: self.flags.clone(),
            student_hint: self.student_hint.clone(),
        }
    }
}

/// Built-in banned terms used to seed an empty store.
pub const DEFAULT_BANNED_TERMS: &[(LanguageCode, &[&str])] = &[
    (LanguageCode::En, &["fuck", "shit", "bitch"]),
    (LanguageCode::Es, &["mierda", "puta"]),
    (LanguageCode::Fr, &["merde", "putain"]),
    (LanguageCode::Ja, &["死ね"]),
    (LanguageCode::De, &["scheiße"]),
    (LanguageCode::It, &["merda"]),
    (LanguageCode::Ko, &["씨발"]),
    (LanguageCode::Zh, &["操你妈"]),
    (LanguageCode::Pt, &["merda"]),
    (LanguageCode::Ar, &["لعنة"]),
];
