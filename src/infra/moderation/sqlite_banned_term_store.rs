// SQLite-backed banned-term store.
//
// Tables:
// - bad_words: one row per (word, language), unique per pair

use crate::core::chat::LanguageCode;
use crate::core::moderation::{BannedTermStore, ModerationError};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::{Pool, Row, Sqlite};

#[derive(Clone)]
pub struct SqliteBannedTermStore {
    pool: Pool<Sqlite>,
}

impl SqliteBannedTermStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bad_words (
                id TEXT PRIMARY KEY,
                word TEXT NOT NULL,
                language TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(word, language)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bad_words_language ON bad_words (language);")
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl BannedTermStore for SqliteBannedTermStore {
    async fn count_terms(&self) -> Result<u64, ModerationError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM bad_words")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn list_terms(&self, language: LanguageCode) -> Result<Vec<String>, ModerationError> {
        let rows = sqlx::query("SELECT word FROM bad_words WHERE language = ? ORDER BY word")
            .bind(language.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(rows.iter().map(|row| row.get("word")).collect())
    }

    async fn insert_terms(
        &self,
        words: &[String],
        language: LanguageCode,
    ) -> Result<u64, ModerationError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        // One transaction per batch; existing pairs are skipped by the
        // UNIQUE(word, language) constraint.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        let mut added = 0;
        for word in words {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO bad_words (id, word, language, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(word)
            .bind(language.as_str())
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;
            added += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;
        Ok(added)
    }
}
