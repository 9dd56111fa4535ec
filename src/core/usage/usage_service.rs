// Usage service - records generative-text calls and reports billing totals.

use super::usage_models::{AiUsage, UsageTotals};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn record(&self, usage: &AiUsage) -> Result<(), UsageError>;
    async fn totals(&self) -> Result<UsageTotals, UsageError>;
}

pub struct UsageService<S: UsageStore> {
    store: S,
}

impl<S: UsageStore> UsageService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Requests and tokens used so far. All zeros when nothing was recorded.
    pub async fn totals(&self) -> Result<UsageTotals, UsageError> {
        self.store.totals().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryUsageStore;

    #[tokio::test]
    async fn test_totals_empty() {
        let service = UsageService::new(InMemoryUsageStore::new());
        assert_eq!(service.totals().await.unwrap(), UsageTotals::default());
    }

    #[tokio::test]
    async fn test_totals_sum_records() {
        let store = InMemoryUsageStore::new();
        store.record(&AiUsage::new("gemini", 10, 20)).await.unwrap();
        store.record(&AiUsage::new("gemini", 5, 1)).await.unwrap();

        let totals = UsageService::new(store).totals().await.unwrap();
        assert_eq!(
            totals,
            UsageTotals {
                total_requests: 2,
                input_tokens: 15,
                output_tokens: 21,
            }
        );
    }
}
