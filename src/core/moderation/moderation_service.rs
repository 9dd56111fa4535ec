// Moderation service - teacher-driven re-moderation of stored messages.
//
// This service handles:
// - Overwriting a stored message's verdict, flags and hint
// - Learning new banned terms when a teacher blocks a message
//
// NO Discord dependencies here - just pure domain logic.

use super::banned_terms::{BannedTermService, BannedTermStore};
use super::moderation_models::{ModerationUpdate, ModerationVerdict};
use crate::core::chat::{ChatError, Message, MessageId, MessageLedger, ValidationError};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Message not found: {0}")]
    NotFound(MessageId),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<ChatError> for ModerationError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::StorageError(e) => ModerationError::StorageError(e),
            ChatError::Validation(e) => ModerationError::Validation(e),
        }
    }
}

/// Result of applying a teacher's moderation decision.
#[derive(Debug, Clone)]
pub struct ModerationOutcome {
    /// The message as stored after the update.
    pub message: Message,
    /// Terms handed to the banned-term list (empty unless the verdict was block).
    pub learned_terms: Vec<String>,
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<L: MessageLedger, S: BannedTermStore> {
    ledger: L,
    banned_terms: Arc<BannedTermService<S>>,
    learn_on_block: bool,
}

impl<L: MessageLedger, S: BannedTermStore> ModerationService<L, S> {
    /// Create the service. With `learn_on_block`, a block verdict also grows
    /// the banned-term list for the message's language.
    pub fn new(ledger: L, banned_terms: Arc<BannedTermService<S>>, learn_on_block: bool) -> Self {
        Self {
            ledger,
            banned_terms,
            learn_on_block,
        }
    }

    /// Apply a human moderation decision to a stored message.
    ///
    /// The new result is trusted as given; it is not checked against what
    /// the content filter would compute.
    pub async fn update_moderation(
        &self,
        message_id: &MessageId,
        update: ModerationUpdate,
    ) -> Result<ModerationOutcome, ModerationError> {
        let message = self
            .ledger
            .get_by_id(message_id)
            .await?
            .ok_or_else(|| ModerationError::NotFound(message_id.clone()))?;

        let mut learned_terms = Vec::new();
        if update.verdict == ModerationVerdict::Block && self.learn_on_block {
            let words = if update.words_to_block.is_empty() {
                let text = message.content.text().trim();
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text.to_string()]
                }
            } else {
                update.words_to_block.clone()
            };

            if !words.is_empty() {
                learned_terms = self.banned_terms.add_terms(&words, message.language).await?;
            }
        }

        let result = update.result();
        if !self.ledger.update_moderation(message_id, &result).await? {
            return Err(ModerationError::NotFound(message_id.clone()));
        }

        tracing::info!(
            message_id = %message_id,
            verdict = %result.verdict,
            learned = learned_terms.len(),
            "Message moderation updated"
        );

        Ok(ModerationOutcome {
            message: Message {
                moderation: result,
                ..message
            },
            learned_terms,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat::{ClassroomId, CourseId, LanguageCode, NewMessage, Role, UserId};
    use crate::core::moderation::{ModerationFlag, ModerationResult};
    use crate::infra::memory::{InMemoryBannedTermStore, InMemoryMessageLedger};

    struct Fixture {
        ledger: InMemoryMessageLedger,
        terms: InMemoryBannedTermStore,
        service: ModerationService<InMemoryMessageLedger, InMemoryBannedTermStore>,
    }

    fn fixture(learn_on_block: bool) -> Fixture {
        let ledger = InMemoryMessageLedger::new();
        let terms = InMemoryBannedTermStore::new();
        let banned = Arc::new(BannedTermService::new(terms.clone()));
        let service = ModerationService::new(ledger.clone(), banned, learn_on_block);
        Fixture {
            ledger,
            terms,
            service,
        }
    }

    async fn stored(ledger: &InMemoryMessageLedger, text: &str) -> Message {
        let new = NewMessage {
            classroom_id: ClassroomId::new("room"),
            course_id: CourseId::English,
            language: LanguageCode::En,
            author_id: UserId::new("student-1"),
            author_role: Role::Student,
            text: text.to_string(),
        };
        ledger.append(new, ModerationResult::allow()).await.unwrap()
    }

    fn block(words: &[&str]) -> ModerationUpdate {
        ModerationUpdate {
            verdict: ModerationVerdict::Block,
            flags: vec![ModerationFlag::Harassment],
            student_hint: Some("Be kind.".to_string()),
            words_to_block: words.iter().map(|w| w.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_block_without_words_learns_message_text() {
        let f = fixture(true);
        let message = stored(&f.ledger, "  you smell  ").await;

        let outcome = f
            .service
            .update_moderation(&message.id, block(&[]))
            .await
            .unwrap();

        assert_eq!(outcome.learned_terms, vec!["you smell"]);
        assert_eq!(
            f.terms.list_terms(LanguageCode::En).await.unwrap(),
            vec!["you smell"]
        );

        let reloaded = f.ledger.get_by_id(&message.id).await.unwrap().unwrap();
        assert_eq!(reloaded.moderation.verdict, ModerationVerdict::Block);
        assert_eq!(reloaded.moderation.flags, vec![ModerationFlag::Harassment]);
        assert_eq!(reloaded.moderation.student_hint.as_deref(), Some("Be kind."));
        assert_eq!(reloaded.content, message.content);
        assert_eq!(reloaded.created_at, message.created_at);
    }

    #[tokio::test]
    async fn test_block_with_explicit_words() {
        let f = fixture(true);
        let message = stored(&f.ledger, "you are a dork and a nerd").await;

        let outcome = f
            .service
            .update_moderation(&message.id, block(&["dork", " nerd "]))
            .await
            .unwrap();

        assert_eq!(outcome.learned_terms, vec!["dork", "nerd"]);
        assert_eq!(
            f.terms.list_terms(LanguageCode::En).await.unwrap(),
            vec!["dork", "nerd"]
        );
    }

    #[tokio::test]
    async fn test_review_does_not_learn() {
        let f = fixture(true);
        let message = stored(&f.ledger, "hmm").await;

        let update = ModerationUpdate {
            verdict: ModerationVerdict::Review,
            flags: vec![ModerationFlag::Spam],
            student_hint: None,
            words_to_block: vec!["hmm".to_string()],
        };
        let outcome = f.service.update_moderation(&message.id, update).await.unwrap();

        assert!(outcome.learned_terms.is_empty());
        assert_eq!(f.terms.count_terms().await.unwrap(), 0);
        assert_eq!(outcome.message.moderation.verdict, ModerationVerdict::Review);
    }

    #[tokio::test]
    async fn test_learning_can_be_disabled() {
        let f = fixture(false);
        let message = stored(&f.ledger, "meanie").await;

        let outcome = f
            .service
            .update_moderation(&message.id, block(&[]))
            .await
            .unwrap();

        assert!(outcome.learned_terms.is_empty());
        assert_eq!(f.terms.count_terms().await.unwrap(), 0);
        assert_eq!(outcome.message.moderation.verdict, ModerationVerdict::Block);
    }

    #[tokio::test]
    async fn test_unknown_message_is_not_found() {
        let f = fixture(true);
        let err = f
            .service
            .update_moderation(&MessageId::new("missing"), block(&["x"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ModerationError::NotFound(_)));
        assert_eq!(f.terms.count_terms().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_allow_override_clears_flags() {
        let f = fixture(true);
        let message = stored(&f.ledger, "fine").await;
        f.service
            .update_moderation(&message.id, block(&[]))
            .await
            .unwrap();

        let update = ModerationUpdate {
            verdict: ModerationVerdict::Allow,
            flags: Vec::new(),
            student_hint: None,
            words_to_block: Vec::new(),
        };
        let outcome = f.service.update_moderation(&message.id, update).await.unwrap();
        assert_eq!(outcome.message.moderation, ModerationResult::allow());
    }
}
