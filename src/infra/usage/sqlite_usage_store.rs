// SQLite-backed usage ledger.
//
// Tables:
// - ai_usage: one row per generative-text call

use crate::core::usage::{AiUsage, UsageError, UsageStore, UsageTotals};
use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::{Pool, Row, Sqlite};

#[derive(Clone)]
pub struct SqliteUsageStore {
    pool: Pool<Sqlite>,
}

impl SqliteUsageStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), UsageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ai_usage (
                id TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                input_tokens INTEGER NOT NULL,
                output_tokens INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| UsageError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl UsageStore for SqliteUsageStore {
    async fn record(&self, usage: &AiUsage) -> Result<(), UsageError> {
        sqlx::query(
            r#"
            INSERT INTO ai_usage (id, model, input_tokens, output_tokens, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&usage.id)
        .bind(&usage.model)
        .bind(usage.input_tokens as i64)
        .bind(usage.output_tokens as i64)
        .bind(usage.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await
        .map_err(|e| UsageError::StorageError(e.to_string()))?;

        Ok(())
    }

    async fn totals(&self) -> Result<UsageTotals, UsageError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_requests,
                COALESCE(SUM(input_tokens), 0) AS input_tokens,
                COALESCE(SUM(output_tokens), 0) AS output_tokens
            FROM ai_usage
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| UsageError::StorageError(e.to_string()))?;

        Ok(UsageTotals {
            total_requests: row.get::<i64, _>("total_requests") as u64,
            input_tokens: row.get::<i64, _>("input_tokens") as u64,
            output_tokens: row.get::<i64, _>("output_tokens") as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::database::memory_pool;

    #[tokio::test]
    async fn test_totals_are_zero_without_records() {
        let store = SqliteUsageStore::new(memory_pool().await);
        assert_eq!(store.totals().await.unwrap(), UsageTotals::default());
    }

    #[tokio::test]
    async fn test_totals_sum_every_record() {
        let store = SqliteUsageStore::new(memory_pool().await);
        store.record(&AiUsage::new("gemini-2.5-flash", 51, 12)).await.unwrap();
        store.record(&AiUsage::new("gemini-2.5-flash", 9, 30)).await.unwrap();
        store.record(&AiUsage::new("other", 0, 0)).await.unwrap();

        let totals = store.totals().await.unwrap();
        assert_eq!(totals.total_requests, 3);
        assert_eq!(totals.input_tokens, 60);
        assert_eq!(totals.output_tokens, 42);
    }
}
