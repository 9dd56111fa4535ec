use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One call to the generative-text service and what it cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiUsage {
    pub id: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub created_at: DateTime<Utc>,
}

impl AiUsage {
    pub fn new(model: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            model: model.into(),
            input_tokens,
            output_tokens,
            created_at: Utc::now(),
        }
    }
}

/// Aggregate usage across every recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub total_requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Rough token count for text when the provider reports none:
/// about four characters per token, rounded.
pub fn estimate_tokens(chars: usize) -> u64 {
    ((chars as f64) / 4.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_rounds() {
        assert_eq!(estimate_tokens(0), 0);
        assert_eq!(estimate_tokens(6), 2);
        assert_eq!(estimate_tokens(5), 1);
        assert_eq!(estimate_tokens(400), 100);
    }
}
