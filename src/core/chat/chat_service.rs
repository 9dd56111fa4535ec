// Chat service - the path from a submitted message to the ledger.
//
// This service handles:
// - Validating submissions
// - Running the content filter against the language's banned terms
// - Storing allowed messages (and only those)
// - Reading classroom history
//
// NO Discord dependencies here - just pure domain logic.

use super::chat_models::{Message, MessageId, NewMessage, SubmitOutcome};
use super::validation::{CreateMessageRequest, ListMessagesQuery, ValidationError};
use crate::core::chat::ClassroomId;
use crate::core::moderation::{
    classify, BannedTermService, BannedTermStore, ModerationError, ModerationResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<ModerationError> for ChatError {
    fn from(err: ModerationError) -> Self {
        match err {
            ModerationError::Validation(e) => ChatError::Validation(e),
            other => ChatError::StorageError(other.to_string()),
        }
    }
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Append-only message storage, per classroom.
///
/// Implementations never classify anything themselves: whoever calls
/// `append` has already run the content filter.
#[async_trait]
pub trait MessageLedger: Send + Sync {
    /// Store a new message with a fresh id and the current time.
    async fn append(
        &self,
        message: NewMessage,
        moderation: ModerationResult,
    ) -> Result<Message, ChatError>;

    /// The `limit` most recent messages of a classroom, oldest first.
    async fn list(&self, classroom_id: &ClassroomId, limit: u32) -> Result<Vec<Message>, ChatError>;

    async fn get_by_id(&self, id: &MessageId) -> Result<Option<Message>, ChatError>;

    /// Overwrite verdict, flags and hint. Returns `false` if no such message.
    async fn update_moderation(
        &self,
        id: &MessageId,
        moderation: &ModerationResult,
    ) -> Result<bool, ChatError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ChatService<L: MessageLedger, S: BannedTermStore> {
    ledger: L,
    banned_terms: Arc<BannedTermService<S>>,
}

impl<L: MessageLedger, S: BannedTermStore> ChatService<L, S> {
    pub fn new(ledger: L, banned_terms: Arc<BannedTermService<S>>) -> Self {
        Self {
            ledger,
            banned_terms,
        }
    }

    /// Validate, classify and (if allowed) store a message.
    ///
    /// A rejection is a normal outcome, not an error: nothing is stored and
    /// the moderation result goes back to the author.
    pub async fn submit(&self, request: CreateMessageRequest) -> Result<SubmitOutcome, ChatError> {
        let message = request.validate()?;

        let terms = self.banned_terms.list_terms(message.language).await?;
        let moderation = classify(&message.text, message.language, &terms);

        if !moderation.is_allowed() {
            tracing::info!(
                classroom_id = %message.classroom_id,
                author_id = %message.author_id,
                flags = ?moderation.flags,
                "Message rejected by classroom filter"
            );
            return Ok(SubmitOutcome::Rejected(moderation));
        }

        let stored = self.ledger.append(message, moderation).await?;
        tracing::info!(
            message_id = %stored.id,
            classroom_id = %stored.classroom_id,
            "Message posted"
        );
        Ok(SubmitOutcome::Posted(stored))
    }

    /// Recent history of a classroom, oldest first.
    pub async fn history(&self, query: &ListMessagesQuery) -> Result<Vec<Message>, ChatError> {
        self.ledger.list(&query.classroom_id, query.limit).await
    }

    /// Look up one stored message.
    pub async fn get(&self, id: &MessageId) -> Result<Option<Message>, ChatError> {
        self.ledger.get_by_id(id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat::{LanguageCode, MessageContent};
    use crate::core::moderation::{ModerationFlag, ModerationVerdict};
    use crate::infra::memory::{InMemoryBannedTermStore, InMemoryMessageLedger};

    fn service() -> (
        InMemoryMessageLedger,
        ChatService<InMemoryMessageLedger, InMemoryBannedTermStore>,
    ) {
        let ledger = InMemoryMessageLedger::new();
        let banned = Arc::new(BannedTermService::new(InMemoryBannedTermStore::new()));
        (ledger.clone(), ChatService::new(ledger, banned))
    }

    fn request(classroom: &str, text: &str) -> CreateMessageRequest {
        CreateMessageRequest {
            classroom_id: classroom.to_string(),
            course_id: "english".to_string(),
            language: Some("en".to_string()),
            author_id: "student-7".to_string(),
            author_role: "student".to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_clean_message_is_posted() {
        let (_, chat) = service();

        let outcome = chat.submit(request("room", "hello teacher")).await.unwrap();
        let SubmitOutcome::Posted(message) = outcome else {
            panic!("expected message to be posted");
        };

        assert_eq!(message.language, LanguageCode::En);
        assert_eq!(message.moderation, ModerationResult::allow());
        assert_eq!(
            message.content,
            MessageContent::Text {
                text: "hello teacher".to_string()
            }
        );

        let fetched = chat.get(&message.id).await.unwrap().unwrap();
        assert_eq!(fetched.content, message.content);
        assert_eq!(fetched.moderation, message.moderation);
    }

    #[tokio::test]
    async fn test_profane_message_rejected_and_not_stored() {
        let (ledger, chat) = service();

        let outcome = chat
            .submit(request("room", "you are an idiot fuck"))
            .await
            .unwrap();

        match outcome {
            SubmitOutcome::Rejected(result) => {
                assert_eq!(result.verdict, ModerationVerdict::Block);
                assert_eq!(result.flags, vec![ModerationFlag::Profanity]);
            }
            SubmitOutcome::Posted(_) => panic!("profanity should be rejected"),
        }
        assert!(ledger.list(&ClassroomId::new("room"), 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_personal_info_rejected() {
        let (_, chat) = service();
        let outcome = chat.submit(request("room", "reach me at a@b.com")).await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Rejected(ref r) if r.flags == vec![ModerationFlag::PersonalInfo]
        ));
    }

    #[tokio::test]
    async fn test_invalid_request_is_validation_error() {
        let (_, chat) = service();
        let err = chat.submit(request("room", "")).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[tokio::test]
    async fn test_history_returns_latest_oldest_first() {
        let (_, chat) = service();
        for i in 0..5 {
            chat.submit(request("room", &format!("message {i}")))
                .await
                .unwrap();
        }
        chat.submit(request("other-room", "elsewhere")).await.unwrap();

        let query = ListMessagesQuery::parse(Some("room"), Some(2)).unwrap();
        let texts: Vec<String> = chat
            .history(&query)
            .await
            .unwrap()
            .iter()
            .map(|m| m.content.text().to_string())
            .collect();

        assert_eq!(texts, vec!["message 3", "message 4"]);
    }

    #[tokio::test]
    async fn test_learned_term_blocks_future_submissions() {
        let (ledger, chat) = service();
        let banned = Arc::clone(&chat.banned_terms);

        banned
            .add_terms(&["dweeb".to_string()], LanguageCode::En)
            .await
            .unwrap();
        let outcome = chat.submit(request("room", "what a Dweeb.")).await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Rejected(_)));
        assert!(ledger.list(&ClassroomId::new("room"), 10).await.unwrap().is_empty());
    }
}
