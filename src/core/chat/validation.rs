// Boundary validation - turns raw request fields into typed domain input.
//
// Every failing field is collected so callers can report all problems at once.

use super::chat_models::{
    ClassroomId, CourseId, LanguageCode, MessageId, NewMessage, Role, UserId, DEFAULT_CLASSROOM,
    MAX_TEXT_CHARS,
};
use crate::core::moderation::{ModerationFlag, ModerationUpdate, ModerationVerdict};
use std::fmt;

/// Default page size for history reads.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
/// Largest page a history read may ask for.
pub const MAX_HISTORY_LIMIT: u32 = 200;

/// One invalid field and what is wrong with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

/// Malformed or out-of-enumeration input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            field,
            message: message.into(),
        });
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationError> {
        if self.issues.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }

    /// Whether `field` is among the failing fields.
    #[allow(dead_code)]
    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed")?;
        for (i, issue) in self.issues.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, issue.field, issue.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Raw message-creation request as received from a client.
#[derive(Debug, Clone, Default)]
pub struct CreateMessageRequest {
    pub classroom_id: String,
    pub course_id: String,
    /// When absent, the course's default language is used.
    pub language: Option<String>,
    pub author_id: String,
    pub author_role: String,
    pub text: String,
}

impl CreateMessageRequest {
    pub fn validate(&self) -> Result<NewMessage, ValidationError> {
        let mut errors = ValidationError::default();

        if self.classroom_id.trim().is_empty() {
            errors.push("classroomId", "Classroom id is required.");
        }
        if self.author_id.trim().is_empty() {
            errors.push("authorId", "Author id is required.");
        }

        let course = self
            .course_id
            .parse::<CourseId>()
            .map_err(|e| errors.push("courseId", e.to_string()))
            .ok();

        let language = match &self.language {
            Some(raw) => raw
                .parse::<LanguageCode>()
                .map_err(|e| errors.push("language", e.to_string()))
                .ok(),
            None => course.map(|c| c.default_language()),
        };

        let role = self
            .author_role
            .parse::<Role>()
            .map_err(|e| errors.push("authorRole", e.to_string()))
            .ok();

        let chars = self.text.chars().count();
        if chars == 0 {
            errors.push("content.text", "Message cannot be empty.");
        } else if chars > MAX_TEXT_CHARS {
            errors.push(
                "content.text",
                format!("Message is too long (max {} characters).", MAX_TEXT_CHARS),
            );
        }

        match (course, language, role) {
            (Some(course_id), Some(language), Some(author_role)) => {
                errors.into_result(|| NewMessage {
                    classroom_id: ClassroomId::new(self.classroom_id.clone()),
                    course_id,
                    language,
                    author_id: UserId::new(self.author_id.clone()),
                    author_role,
                    text: self.text.clone(),
                })
            }
            _ => Err(errors),
        }
    }
}

/// A validated history read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMessagesQuery {
    pub classroom_id: ClassroomId,
    pub limit: u32,
}

impl ListMessagesQuery {
    /// Validate a history read. A supplied limit must be positive and is
    /// clamped to [`MAX_HISTORY_LIMIT`].
    pub fn parse(classroom_id: Option<&str>, limit: Option<i64>) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();

        let classroom_id = classroom_id
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CLASSROOM);

        let limit = match limit {
            None => DEFAULT_HISTORY_LIMIT,
            Some(l) if l <= 0 => {
                errors.push("limit", "Invalid limit");
                DEFAULT_HISTORY_LIMIT
            }
            Some(l) => l.min(MAX_HISTORY_LIMIT as i64) as u32,
        };

        errors.into_result(|| Self {
            classroom_id: ClassroomId::new(classroom_id),
            limit,
        })
    }
}

/// Raw moderation-update request.
#[derive(Debug, Clone, Default)]
pub struct ModerationUpdateRequest {
    pub message_id: String,
    pub verdict: String,
    pub flags: Vec<String>,
    pub student_hint: Option<String>,
    pub words_to_block: Option<Vec<String>>,
}

impl ModerationUpdateRequest {
    pub fn validate(&self) -> Result<(MessageId, ModerationUpdate), ValidationError> {
        let mut errors = ValidationError::default();

        if self.message_id.trim().is_empty() {
            errors.push("messageId", "Message id is required.");
        }

        let verdict = self
            .verdict
            .parse::<ModerationVerdict>()
            .map_err(|e| errors.push("verdict", e.to_string()))
            .ok();

        let mut flags = Vec::new();
        for raw in &self.flags {
            match raw.parse::<ModerationFlag>() {
                Ok(flag) if !flags.contains(&flag) => flags.push(flag),
                Ok(_) => {}
                Err(e) => errors.push("flags", e.to_string()),
            }
        }

        let words = self.words_to_block.clone().unwrap_or_default();
        if words.iter().any(|w| w.is_empty()) {
            errors.push("wordsToBlock", "Words to block cannot be empty.");
        }

        match verdict {
            Some(verdict) => errors.into_result(|| {
                (
                    MessageId::new(self.message_id.trim()),
                    ModerationUpdate {
                        verdict,
                        flags,
                        student_hint: self.student_hint.clone(),
                        words_to_block: words,
                    },
                )
            }),
            None => Err(errors),
        }
    }
}
