// Banned-term service - per-language word lists used by the content filter.
//
// The store is seeded from DEFAULT_BANNED_TERMS the first time anything
// reads it. Uniqueness of (word, language) is the store's job, so seeding
// twice or adding a word twice never creates a duplicate.

use super::moderation_models::DEFAULT_BANNED_TERMS;
use super::moderation_service::ModerationError;
use crate::core::chat::LanguageCode;
use async_trait::async_trait;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait BannedTermStore: Send + Sync {
    /// Number of banned terms across every language.
    async fn count_terms(&self) -> Result<u64, ModerationError>;

    /// All terms for a language, sorted.
    async fn list_terms(&self, language: LanguageCode) -> Result<Vec<String>, ModerationError>;

    /// Insert terms, ignoring pairs that already exist.
    /// Returns how many rows were actually added.
    async fn insert_terms(
        &self,
        words: &[String],
        language: LanguageCode,
    ) -> Result<u64, ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct BannedTermService<S: BannedTermStore> {
    store: S,
}

impl<S: BannedTermStore> BannedTermService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Banned terms for a language, seeding the store if it was never populated.
    pub async fn list_terms(&self, language: LanguageCode) -> Result<Vec<String>, ModerationError> {
        let existing = self.store.list_terms(language).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        self.seed_if_empty().await?;
        self.store.list_terms(language).await
    }

    /// Insert the built-in table when the store holds nothing at all.
    ///
    /// Two callers may both observe an empty store; the store's uniqueness
    /// constraint absorbs the second round of inserts.
    pub async fn seed_if_empty(&self) -> Result<(), ModerationError> {
        if self.store.count_terms().await? > 0 {
            return Ok(());
        }

        let mut seeded = 0;
        for (language, words) in DEFAULT_BANNED_TERMS {
            let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
            seeded += self.store.insert_terms(&words, *language).await?;
        }
        tracing::info!(seeded, "Seeded default banned terms");
        Ok(())
    }

    /// Add candidate terms for a language.
    ///
    /// Each candidate is trimmed and blanks are dropped. Terms already on the
    /// list are ignored without error. Returns the cleaned candidates.
    pub async fn add_terms(
        &self,
        words: &[String],
        language: LanguageCode,
    ) -> Result<Vec<String>, ModerationError> {
        let mut cleaned: Vec<String> = Vec::new();
        for word in words {
            let trimmed = word.trim();
            if !trimmed.is_empty() && !cleaned.iter().any(|w| w == trimmed) {
                cleaned.push(trimmed.to_string());
            }
        }

        if cleaned.is_empty() {
            return Ok(cleaned);
        }

        let added = self.store.insert_terms(&cleaned, language).await?;
        tracing::info!(
            language = %language,
            candidates = cleaned.len(),
            added,
            "Banned terms updated"
        );
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryBannedTermStore;

    #[tokio::test]
    async fn test_list_seeds_empty_store() {
        let service = BannedTermService::new(InMemoryBannedTermStore::new());

        let en = service.list_terms(LanguageCode::En).await.unwrap();
        assert_eq!(en, vec!["bitch", "fuck", "shit"]);

        let ja = service.list_terms(LanguageCode::Ja).await.unwrap();
        assert_eq!(ja, vec!["死ね"]);
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let store = InMemoryBannedTermStore::new();
        let service = BannedTermService::new(store.clone());

        service.seed_if_empty().await.unwrap();
        let before = store.count_terms().await.unwrap();

        // A racing seeder that also saw an empty store re-inserts the table.
        for (language, words) in DEFAULT_BANNED_TERMS {
            let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
            store.insert_terms(&words, *language).await.unwrap();
        }
        service.seed_if_empty().await.unwrap();

        assert_eq!(store.count_terms().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_add_terms_trims_and_skips_blanks() {
        let store = InMemoryBannedTermStore::new();
        let service = BannedTermService::new(store.clone());

        let added = service
            .add_terms(
                &["  dumb ".to_string(), "".to_string(), "   ".to_string()],
                LanguageCode::En,
            )
            .await
            .unwrap();

        assert_eq!(added, vec!["dumb"]);
        assert_eq!(store.list_terms(LanguageCode::En).await.unwrap(), vec!["dumb"]);
    }

    #[tokio::test]
    async fn test_add_terms_is_idempotent() {
        let store = InMemoryBannedTermStore::new();
        let service = BannedTermService::new(store.clone());

        service
            .add_terms(&["dumb".to_string()], LanguageCode::En)
            .await
            .unwrap();
        service
            .add_terms(&["dumb".to_string(), " dumb".to_string()], LanguageCode::En)
            .await
            .unwrap();

        assert_eq!(store.list_terms(LanguageCode::En).await.unwrap(), vec!["dumb"]);
    }

    #[tokio::test]
    async fn test_terms_are_scoped_per_language() {
        let store = InMemoryBannedTermStore::new();
        let service = BannedTermService::new(store.clone());

        service
            .add_terms(&["tonto".to_string()], LanguageCode::Es)
            .await
            .unwrap();

        assert!(store.list_terms(LanguageCode::En).await.unwrap().is_empty());
        assert_eq!(store.list_terms(LanguageCode::Es).await.unwrap(), vec!["tonto"]);
    }
}
