// Chat domain models - classroom messages and the enumerations they carry.
//
// These are pure domain types with no Discord or database dependencies.
// Identifiers are thin newtypes so a classroom id can never be passed where
// a message id is expected.

use crate::core::moderation::ModerationResult;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a text message, in characters.
pub const MAX_TEXT_CHARS: usize = 500;

/// Classroom used when a read request names none.
pub const DEFAULT_CLASSROOM: &str = "demo-classroom";

// ============================================================================
// IDENTIFIERS
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Opaque message identifier, assigned once at creation.
    MessageId
);
string_id!(
    /// Classroom identifier. On Discord this is the channel id.
    ClassroomId
);
string_id!(
    /// Author identifier. On Discord this is the user id.
    UserId
);

impl MessageId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

// ============================================================================
// ENUMERATIONS
// ============================================================================

/// Error returned when a wire name does not belong to an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a unit enum together with its lowercase wire names.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            #[allow(dead_code)]
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::core::chat::chat_models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($wire => Ok($name::$variant),)+
                    other => Err($crate::core::chat::chat_models::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}
pub(crate) use wire_enum;

wire_enum!(
    /// Languages a classroom can be taught in.
    LanguageCode, "language" {
        En => "en",
        Es => "es",
        Fr => "fr",
        Ja => "ja",
        De => "de",
        It => "it",
        Ko => "ko",
        Zh => "zh",
        Pt => "pt",
        Ar => "ar",
    }
);

impl LanguageCode {
    /// Whether words in this language are separated by spaces, so a banned
    /// single word can be required to stand on word boundaries.
    ///
    /// Japanese, Chinese, Korean and Arabic attach particles and affixes
    /// directly to words, so those fall back to containment.
    pub fn has_word_boundaries(&self) -> bool {
        !matches!(
            self,
            LanguageCode::Ja | LanguageCode::Zh | LanguageCode::Ko | LanguageCode::Ar
        )
    }
}

wire_enum!(
    /// Courses offered by the school.
    CourseId, "course" {
        Spanish => "spanish",
        French => "french",
        Japanese => "japanese",
        German => "german",
        Italian => "italian",
        Korean => "korean",
        Chinese => "chinese",
        Portuguese => "portuguese",
        Arabic => "arabic",
        English => "english",
    }
);

impl CourseId {
    /// The language a course is normally taught in.
    pub fn default_language(&self) -> LanguageCode {
        match self {
            CourseId::Spanish => LanguageCode::Es,
            CourseId::French => LanguageCode::Fr,
            CourseId::Japanese => LanguageCode::Ja,
            CourseId::German => LanguageCode::De,
            CourseId::Italian => LanguageCode::It,
            CourseId::Korean => LanguageCode::Ko,
            CourseId::Chinese => LanguageCode::Zh,
            CourseId::Portuguese => LanguageCode::Pt,
            CourseId::Arabic => LanguageCode::Ar,
            CourseId::English => LanguageCode::En,
        }
    }
}

wire_enum!(
    /// Who wrote a message.
    Role, "role" {
        Student => "student",
        Teacher => "teacher",
    }
);

// ============================================================================
// MESSAGES
// ============================================================================

/// Message payload. Only free text exists today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
}

impl MessageContent {
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContent::Text { .. } => "text",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            MessageContent::Text { text } => text,
        }
    }
}

/// A persisted classroom message together with its moderation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub classroom_id: ClassroomId,
    pub course_id: CourseId,
    pub language: LanguageCode,
    pub author_id: UserId,
    pub author_role: Role,
    pub created_at: DateTime<Utc>,
    pub content: MessageContent,
    pub moderation: ModerationResult,
}

/// Current time at the precision the ledger keeps (microseconds), so a
/// stored message reads back exactly as it was returned from `append`.
pub fn ledger_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A validated message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub classroom_id: ClassroomId,
    pub course_id: CourseId,
    pub language: LanguageCode,
    pub author_id: UserId,
    pub author_role: Role,
    pub text: String,
}

/// Outcome of submitting a message.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The filter allowed the message and it was stored.
    Posted(Message),
    /// The filter refused the message. Nothing was stored.
    Rejected(ModerationResult),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_ledger_now_has_microsecond_precision() {
        let now = ledger_now();
        assert_eq!(now.nanosecond() % 1_000, 0);
        let stored = now.to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
        assert_eq!(DateTime::parse_from_rfc3339(&stored).unwrap(), now);
    }

    #[test]
    fn test_language_round_trips_through_wire_name() {
        for language in LanguageCode::ALL {
            assert_eq!(language.as_str().parse::<LanguageCode>(), Ok(*language));
        }
    }

    #[test]
    fn test_unknown_course_is_rejected() {
        let err = "klingon".parse::<CourseId>().unwrap_err();
        assert_eq!(err.kind, "course");
        assert_eq!(err.to_string(), "Unknown course 'klingon'");
    }

    #[test]
    fn test_course_default_language() {
        assert_eq!(CourseId::Japanese.default_language(), LanguageCode::Ja);
        assert_eq!(CourseId::English.default_language(), LanguageCode::En);
    }

    #[test]
    fn test_message_content_serializes_with_kind_tag() {
        let content = MessageContent::Text {
            text: "hola".to_string(),
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "text", "text": "hola"}));
    }

    #[test]
    fn test_generated_message_ids_are_unique() {
        assert_ne!(MessageId::generate(), MessageId::generate());
    }
}
