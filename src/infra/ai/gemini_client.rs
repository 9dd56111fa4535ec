// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// Implementation of `AiProvider` on top of Google's Gemini REST API
// (https://ai.google.dev/gemini-api/docs).
//
// - Authentication: API key is passed as a query parameter (`?key=API_KEY`).
// - Request format: `contents[]` with nested `parts`; system messages go to the
//   top-level `systemInstruction` field.
// - Blocking calls use `:generateContent`.
// - Streaming calls use `:streamGenerateContent?alt=sse`, which answers with
//   server-sent events whose `data:` lines each hold a partial response.
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - Your API key from https://aistudio.google.com/apikey
// - `GEMINI_MODEL` - Model name, defaults to `gemini-2.5-flash`

use crate::core::ai::{AiConfig, AiError, AiMessage, AiProvider, AiProviderResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================
//
// See: https://ai.google.dev/api/generate-content

/// A single part of content. Only text parts are used here.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// A message in the conversation. Gemini says "model" where we say "assistant".
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

/// Generation configuration options that control the model's output.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    /// Controls randomness. Range: [0.0, 2.0].
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,

    #[allow(dead_code)]
    finish_reason: Option<String>,
}

/// Token usage metadata for the request.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

impl UsageMetadata {
    fn token_usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.prompt_token_count.unwrap_or(0),
            output_tokens: self.candidates_token_count.unwrap_or(0),
        }
    }
}

/// The response body of `generateContent`, and of each streamed event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.as_ref()?.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[allow(dead_code)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// SERVER-SENT EVENTS
// =============================================================================

/// Splits a byte stream into SSE lines and decodes the `data:` payloads.
///
/// Network chunks can end in the middle of a line (or of a UTF-8 sequence),
/// so bytes are buffered until a newline arrives.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Result<Vec<GenerateContentResponse>, AiError> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = Self::decode_line(&line)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Decode whatever is left once the body has ended.
    fn finish(&mut self) -> Result<Option<GenerateContentResponse>, AiError> {
        let rest = std::mem::take(&mut self.buffer);
        Self::decode_line(&rest)
    }

    fn decode_line(line: &[u8]) -> Result<Option<GenerateContentResponse>, AiError> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        let Some(payload) = line.strip_prefix("data:") else {
            return Ok(None);
        };
        let payload = payload.trim();
        if payload.is_empty() || payload == "[DONE]" {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(payload)?))
    }
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

/// Client for Google's Gemini API.
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    fn text_part(text: String) -> Part {
        Part { text: Some(text) }
    }

    /// Converts an `AiMessage` to Gemini's `Content`, mapping "assistant" to "model".
    fn convert_message(msg: &AiMessage) -> Content {
        let role = match msg.role.as_str() {
            "assistant" => "model".to_string(),
            other => other.to_string(),
        };

        Content {
            role,
            parts: vec![Self::text_part(msg.content.clone())],
        }
    }

    fn build_request(messages: &[AiMessage], config: &AiConfig) -> GenerateContentRequest {
        // Every system message is folded into a single systemInstruction.
        let system_text: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();
        let system_instruction = (!system_text.is_empty()).then(|| Content {
            role: "user".to_string(),
            parts: vec![Self::text_part(system_text.join("\n\n"))],
        });

        let contents = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(Self::convert_message)
            .collect();

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: Some(GenerationConfig {
                temperature: Some(config.temperature),
                max_output_tokens: config.max_tokens,
                top_p: config.top_p,
            }),
        }
    }

    async fn send(
        &self,
        url: &str,
        request: &GenerateContentRequest,
    ) -> Result<reqwest::Response, AiError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                return Err(format!(
                    "Gemini API error ({}): {}",
                    status, error_response.error.message
                )
                .into());
            }

            return Err(format!("Gemini API error: {} - {}", status, error_text).into());
        }

        Ok(response)
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, AiError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            API_BASE, config.model, self.api_key
        );
        let request = Self::build_request(messages, config);

        // Never log the URL, it carries the API key.
        tracing::debug!(
            "Gemini request to model {}: {} messages",
            config.model,
            messages.len()
        );

        let response: GenerateContentResponse = self.send(&url, &request).await?.json().await?;

        let content = response.text().ok_or(
            "No content in Gemini response - the model may have been blocked by safety filters",
        )?;

        tracing::debug!("Gemini response received: {} chars", content.len());

        Ok(AiProviderResponse {
            content,
            usage: response.usage_metadata.map(|u| u.token_usage()),
        })
    }

    async fn chat_stream(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
        sink: mpsc::Sender<String>,
    ) -> Result<AiProviderResponse, AiError> {
        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse&key={}",
            API_BASE, config.model, self.api_key
        );
        let request = Self::build_request(messages, config);

        tracing::debug!(
            "Gemini stream request to model {}: {} messages",
            config.model,
            messages.len()
        );

        let mut response = self.send(&url, &request).await?;
        let mut decoder = SseDecoder::default();
        let mut content = String::new();
        let mut usage = None;

        let mut forward = |event: GenerateContentResponse, content: &mut String| {
            if let Some(meta) = event.usage_metadata {
                usage = Some(meta.token_usage());
            }
            event.text().filter(|t| !t.is_empty()).map(|delta| {
                content.push_str(&delta);
                delta
            })
        };

        while let Some(chunk) = response.chunk().await? {
            for event in decoder.push(&chunk)? {
                if let Some(delta) = forward(event, &mut content) {
                    // The reader may have gone away; keep draining for usage.
                    let _ = sink.send(delta).await;
                }
            }
        }
        if let Some(event) = decoder.finish()? {
            if let Some(delta) = forward(event, &mut content) {
                let _ = sink.send(delta).await;
            }
        }

        tracing::debug!("Gemini stream finished: {} chars", content.len());

        Ok(AiProviderResponse { content, usage })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AiConfig {
        AiConfig {
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            max_tokens: Some(1000),
            top_p: None,
        }
    }

    #[test]
    fn test_convert_message_user() {
        let content = GeminiClient::convert_message(&AiMessage::user("Hello!"));

        assert_eq!(content.role, "user");
        assert_eq!(content.parts.len(), 1);
        assert_eq!(content.parts[0].text, Some("Hello!".to_string()));
    }

    #[test]
    fn test_convert_message_assistant_to_model() {
        let content = GeminiClient::convert_message(&AiMessage::assistant("Hi there!"));

        assert_eq!(content.role, "model");
        assert_eq!(content.parts[0].text, Some("Hi there!".to_string()));
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![
            AiMessage::system("Be kind."),
            AiMessage::user("hi"),
            AiMessage::assistant("hello"),
            AiMessage::user("how are you?"),
        ];
        let request = GeminiClient::build_request(&messages, &config());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be kind.");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1000);
        assert!(json["generationConfig"].get("topP").is_none());
    }

    #[test]
    fn test_request_without_system_message() {
        let request = GeminiClient::build_request(&[AiMessage::user("hi")], &config());
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("systemInstruction"));
    }

    #[test]
    fn test_response_text_and_usage() {
        let body = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Hola "}, {"text": "mundo"}]}}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4, "totalTokenCount": 16}
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.text().as_deref(), Some("Hola mundo"));
        assert_eq!(
            response.usage_metadata.unwrap().token_usage(),
            TokenUsage {
                input_tokens: 12,
                output_tokens: 4
            }
        );
    }

    #[test]
    fn test_response_without_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_sse_decoder_handles_split_chunks() {
        let stream = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Bon\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"jour é\"}]}}],",
            "\"usageMetadata\":{\"promptTokenCount\":3,\"candidatesTokenCount\":2}}\r\n\r\n",
        )
        .as_bytes();

        // Split inside the multi-byte "é" to exercise buffering.
        let split = stream.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::default();
        let mut events = decoder.push(&stream[..split]).unwrap();
        assert_eq!(events.len(), 1);
        events.extend(decoder.push(&stream[split..]).unwrap());
        assert!(decoder.finish().unwrap().is_none());

        let text: String = events.iter().filter_map(|e| e.text()).collect();
        assert_eq!(text, "Bonjour é");
        assert!(events[1].usage_metadata.is_some());
    }

    #[test]
    fn test_sse_decoder_ignores_non_data_lines() {
        let mut decoder = SseDecoder::default();
        let events = decoder
            .push(b": keep-alive\nevent: message\ndata: [DONE]\n\n")
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_sse_decoder_rejects_malformed_payload() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {not json}\n").is_err());
    }

    #[test]
    fn test_sse_decoder_flushes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder
            .push(b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"end\"}]}}]}")
            .unwrap()
            .is_empty());
        let last = decoder.finish().unwrap().unwrap();
        assert_eq!(last.text().as_deref(), Some("end"));
    }
}
