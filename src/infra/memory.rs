// In-memory implementations of the core storage traits.
//
// Backed by DashMap so concurrent tasks can share them without a Mutex.
// They behave like the SQLite stores (same ordering, same uniqueness rules)
// and are what the core service tests run against.
#![allow(dead_code)]

use crate::core::chat::{
    ledger_now, ChatError, ClassroomId, LanguageCode, Message, MessageContent, MessageId,
    MessageLedger, NewMessage,
};
use crate::core::moderation::{BannedTermStore, ModerationError, ModerationResult};
use crate::core::usage::{AiUsage, UsageError, UsageStore, UsageTotals};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// MESSAGE LEDGER
// ============================================================================

#[derive(Clone, Default)]
pub struct InMemoryMessageLedger {
    /// Message id -> (insertion sequence, message)
    messages: Arc<DashMap<MessageId, (u64, Message)>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryMessageLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageLedger for InMemoryMessageLedger {
    async fn append(
        &self,
        message: NewMessage,
        moderation: ModerationResult,
    ) -> Result<Message, ChatError> {
        let stored = Message {
            id: MessageId::generate(),
            classroom_id: message.classroom_id,
            course_id: message.course_id,
            language: message.language,
            author_id: message.author_id,
            author_role: message.author_role,
            created_at: ledger_now(),
            content: MessageContent::Text { text: message.text },
            moderation,
        };

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.messages
            .insert(stored.id.clone(), (seq, stored.clone()));
        Ok(stored)
    }

    async fn list(&self, classroom_id: &ClassroomId, limit: u32) -> Result<Vec<Message>, ChatError> {
        let mut rows: Vec<(u64, Message)> = self
            .messages
            .iter()
            .filter(|entry| &entry.value().1.classroom_id == classroom_id)
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first, like the SQL query, then flip for the caller.
        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
        });
        rows.truncate(limit as usize);
        rows.reverse();

        Ok(rows.into_iter().map(|(_, m)| m).collect())
    }

    async fn get_by_id(&self, id: &MessageId) -> Result<Option<Message>, ChatError> {
        Ok(self.messages.get(id).map(|entry| entry.value().1.clone()))
    }

    async fn update_moderation(
        &self,
        id: &MessageId,
        moderation: &ModerationResult,
    ) -> Result<bool, ChatError> {
        match self.messages.get_mut(id) {
            Some(mut entry) => {
                entry.value_mut().1.moderation = moderation.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ============================================================================
// BANNED TERMS
// ============================================================================

#[derive(Clone, Default)]
pub struct InMemoryBannedTermStore {
    terms: Arc<DashMap<LanguageCode, BTreeSet<String>>>,
}

impl InMemoryBannedTermStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BannedTermStore for InMemoryBannedTermStore {
    async fn count_terms(&self) -> Result<u64, ModerationError> {
        Ok(self.terms.iter().map(|entry| entry.value().len() as u64).sum())
    }

    async fn list_terms(&self, language: LanguageCode) -> Result<Vec<String>, ModerationError> {
        Ok(self
            .terms
            .get(&language)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_terms(
        &self,
        words: &[String],
        language: LanguageCode,
    ) -> Result<u64, ModerationError> {
        let mut set = self.terms.entry(language).or_default();
        let added = words
            .iter()
            .filter(|word| set.insert(word.to_string()))
            .count();
        Ok(added as u64)
    }
}

// ============================================================================
// AI USAGE
// ============================================================================

#[derive(Clone, Default)]
pub struct InMemoryUsageStore {
    records: Arc<DashMap<String, AiUsage>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn record(&self, usage: &AiUsage) -> Result<(), UsageError> {
        self.records.insert(usage.id.clone(), usage.clone());
        Ok(())
    }

    async fn totals(&self) -> Result<UsageTotals, UsageError> {
        Ok(self
            .records
            .iter()
            .fold(UsageTotals::default(), |mut acc, entry| {
                acc.total_requests += 1;
                acc.input_tokens += entry.input_tokens;
                acc.output_tokens += entry.output_tokens;
                acc
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat::{CourseId, Role, UserId};
    use chrono::Timelike;

    #[tokio::test]
    async fn test_append_matches_stored_message() {
        let ledger = InMemoryMessageLedger::new();
        let appended = ledger
            .append(
                NewMessage {
                    classroom_id: ClassroomId::new("room"),
                    course_id: CourseId::French,
                    language: LanguageCode::Fr,
                    author_id: UserId::new("u-1"),
                    author_role: Role::Student,
                    text: "bonjour".to_string(),
                },
                ModerationResult::allow(),
            )
            .await
            .unwrap();

        assert_eq!(appended.created_at.nanosecond() % 1_000, 0);
        let fetched = ledger.get_by_id(&appended.id).await.unwrap().unwrap();
        assert_eq!(fetched, appended);
    }
}
