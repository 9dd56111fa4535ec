use super::models::{AiConfig, AiMessage, AiProviderResponse, TokenUsage};
use crate::core::chat::LanguageCode;
use crate::core::usage::{estimate_tokens, AiUsage, UsageStore};
use async_trait::async_trait;
use std::error::Error;
use tokio::sync::mpsc;

pub type AiError = Box<dyn Error + Send + Sync>;

const PING_PROMPT: &str = "Hello, are you working?";

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends a chat completion request and waits for the whole reply.
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError>;

    /// Streams a reply, pushing each text delta into `sink` as it arrives.
    ///
    /// Returns the accumulated reply once the stream ends. A closed sink does
    /// not abort the call.
    async fn chat_stream(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
        sink: mpsc::Sender<String>,
    ) -> Result<AiProviderResponse, AiError>;
}

// Blanket implementation for Box<dyn AiProvider> so providers can be picked
// at runtime.
#[async_trait]
impl AiProvider for Box<dyn AiProvider> {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError> {
        (**self).chat_complete(messages, config).await
    }

    async fn chat_stream(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
        sink: mpsc::Sender<String>,
    ) -> Result<AiProviderResponse, AiError> {
        (**self).chat_stream(messages, config, sink).await
    }
}

/// Prompt asking the assistant to explain why a message was blocked.
pub fn explain_prompt(text: &str, language: LanguageCode) -> String {
    format!(
        "You are a helpful teacher assistant in a classroom. A student wrote the following \
         message which was blocked because it contains inappropriate language (profanity) or \
         personal information: \"{text}\". The language of the context is \"{language}\".\n\n\
         Please explain to the student why this message is not appropriate for a classroom \
         setting. Be gentle, educational, and concise. Do not repeat the bad word if possible, \
         or refer to it indirectly. Focus on psychological safety and respect.\n\n\
         Explain in the same language as the context ({language})."
    )
}

/// Generative-text assistant: block explanations and open-ended chat.
///
/// Every successful call is recorded in the usage store.
pub struct AiService<P: AiProvider, U: UsageStore> {
    provider: P,
    usage: U,
    config: AiConfig,
}

impl<P: AiProvider, U: UsageStore> AiService<P, U> {
    pub fn new(provider: P, usage: U, config: AiConfig) -> Self {
        Self {
            provider,
            usage,
            config,
        }
    }

    /// Explain to a student, in their language, why their message was blocked.
    pub async fn explain_block(&self, text: &str, language: LanguageCode) -> Result<String, AiError> {
        let messages = vec![AiMessage::user(explain_prompt(text, language))];
        let response = self.provider.chat_complete(&messages, &self.config).await?;

        let estimated = TokenUsage {
            input_tokens: estimate_tokens(text.chars().count() + 200),
            output_tokens: estimate_tokens(response.content.chars().count()),
        };
        self.record(response.usage.unwrap_or(estimated)).await?;

        Ok(response.content)
    }

    /// Stream a reply to `history`, whose last entry is the new utterance.
    ///
    /// Deltas go to `sink`; the full reply is returned at the end.
    pub async fn chat_stream(
        &self,
        history: &[AiMessage],
        sink: mpsc::Sender<String>,
    ) -> Result<String, AiError> {
        if history.is_empty() {
            return Err("Missing messages".into());
        }

        let response = self
            .provider
            .chat_stream(history, &self.config, sink)
            .await?;

        let history_chars: usize = history.iter().map(|m| m.content.chars().count()).sum();
        let estimated = TokenUsage {
            input_tokens: estimate_tokens(history_chars),
            output_tokens: estimate_tokens(response.content.chars().count()),
        };
        self.record(response.usage.unwrap_or(estimated)).await?;

        Ok(response.content)
    }

    /// Check that the provider answers at all.
    pub async fn ping(&self) -> Result<String, AiError> {
        let messages = vec![AiMessage::user(PING_PROMPT)];
        let response = self.provider.chat_complete(&messages, &self.config).await?;
        Ok(response.content)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn record(&self, tokens: TokenUsage) -> Result<(), AiError> {
        let usage = AiUsage::new(
            self.config.model.clone(),
            tokens.input_tokens,
            tokens.output_tokens,
        );
        self.usage.record(&usage).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryUsageStore;
    use std::sync::Mutex;

    /// Provider that replays a canned reply and remembers what it was sent.
    struct ScriptedProvider {
        reply: String,
        usage: Option<TokenUsage>,
        seen: Mutex<Vec<Vec<AiMessage>>>,
    }

    impl ScriptedProvider {
        fn new(reply: &str, usage: Option<TokenUsage>) -> Self {
            Self {
                reply: reply.to_string(),
                usage,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AiProvider for ScriptedProvider {
        async fn chat_complete(
            &self,
            messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<AiProviderResponse, AiError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(AiProviderResponse {
                content: self.reply.clone(),
                usage: self.usage,
            })
        }

        async fn chat_stream(
            &self,
            messages: &[AiMessage],
            _config: &AiConfig,
            sink: mpsc::Sender<String>,
        ) -> Result<AiProviderResponse, AiError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            for word in self.reply.split_inclusive(' ') {
                let _ = sink.send(word.to_string()).await;
            }
            Ok(AiProviderResponse {
                content: self.reply.clone(),
                usage: self.usage,
            })
        }
    }

    fn config() -> AiConfig {
        AiConfig {
            model: "test-model".to_string(),
            temperature: 0.7,
            max_tokens: None,
            top_p: None,
        }
    }

    #[test]
    fn test_explain_prompt_mentions_text_and_language() {
        let prompt = explain_prompt("bad words", LanguageCode::Fr);
        assert!(prompt.contains("\"bad words\""));
        assert!(prompt.contains("(fr)"));
    }

    #[tokio::test]
    async fn test_explain_records_estimated_usage() {
        let usage = InMemoryUsageStore::new();
        let service = AiService::new(
            ScriptedProvider::new("abcdefgh", None),
            usage.clone(),
            config(),
        );

        let explanation = service.explain_block("abcd", LanguageCode::En).await.unwrap();
        assert_eq!(explanation, "abcdefgh");

        let totals = usage.totals().await.unwrap();
        assert_eq!(totals.total_requests, 1);
        assert_eq!(totals.input_tokens, 51); // (4 + 200) / 4
        assert_eq!(totals.output_tokens, 2);
    }

    #[tokio::test]
    async fn test_provider_usage_preferred_over_estimate() {
        let usage = InMemoryUsageStore::new();
        let reported = TokenUsage {
            input_tokens: 7,
            output_tokens: 3,
        };
        let service = AiService::new(
            ScriptedProvider::new("ok", Some(reported)),
            usage.clone(),
            config(),
        );

        service.explain_block("x", LanguageCode::En).await.unwrap();
        let totals = usage.totals().await.unwrap();
        assert_eq!(totals.input_tokens, 7);
        assert_eq!(totals.output_tokens, 3);
    }

    #[tokio::test]
    async fn test_chat_stream_forwards_deltas() {
        let usage = InMemoryUsageStore::new();
        let service = AiService::new(
            ScriptedProvider::new("hola que tal", None),
            usage.clone(),
            config(),
        );
        let (tx, mut rx) = mpsc::channel(16);

        let history = vec![AiMessage::user("hi"), AiMessage::assistant("hello"), AiMessage::user("how?")];
        let reply = service.chat_stream(&history, tx).await.unwrap();

        let mut streamed = String::new();
        while let Some(delta) = rx.recv().await {
            streamed.push_str(&delta);
        }
        assert_eq!(reply, "hola que tal");
        assert_eq!(streamed, reply);
        assert_eq!(usage.totals().await.unwrap().total_requests, 1);
    }

    #[tokio::test]
    async fn test_chat_stream_requires_history() {
        let service = AiService::new(
            ScriptedProvider::new("", None),
            InMemoryUsageStore::new(),
            config(),
        );
        let (tx, _rx) = mpsc::channel(1);
        assert!(service.chat_stream(&[], tx).await.is_err());
    }

    #[tokio::test]
    async fn test_ping_is_not_billed() {
        let usage = InMemoryUsageStore::new();
        let provider = ScriptedProvider::new("yes", None);
        let service = AiService::new(provider, usage.clone(), config());

        assert_eq!(service.ping().await.unwrap(), "yes");
        assert_eq!(usage.totals().await.unwrap().total_requests, 0);
        let seen = service.provider.seen.lock().unwrap();
        assert_eq!(seen[0][0].content, PING_PROMPT);
    }
}
