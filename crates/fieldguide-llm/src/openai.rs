//! OpenAI HTTP client (chat completions, embeddings, model listing).

use crate::error::{LlmError, LlmResult};
use crate::provider::{Embedder, LanguageModel};
use crate::stream::{spawn_reader, LineOutcome, TokenStream};
use crate::types::GenerationRequest;
use async_trait::async_trait;
use fieldguide_config::ModelConfig;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Chat models are the ones whose id starts with this prefix.
const CHAT_MODEL_PREFIX: &str = "gpt";

/// Client for OpenAI's REST API.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    embedding_model: String,
}

impl OpenAiClient {
    /// Create a client from configuration. A missing API key is reported on first use.
    ///
    /// The configured timeout bounds connecting and each non-streaming request;
    /// streamed completions are bounded per read.
    pub fn from_config(config: &ModelConfig) -> LlmResult<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: config.resolved_host(),
            api_key: config.resolved_api_key(),
            timeout,
            embedding_model: config.embedding_model.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> LlmResult<RequestBuilder> {
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                LlmError::Authentication(
                    "no API key configured; set OPENAI_API_KEY or model.api_key".to_string(),
                )
            })?;
        Ok(request
            .header(AUTHORIZATION, format!("Bearer {}", key))
            .header(CONTENT_TYPE, "application/json"))
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::Unreachable {
                host: self.base_url.clone(),
                message: e.to_string(),
            }
        } else if e.is_timeout() {
            LlmError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            LlmError::Http(e)
        }
    }

    async fn send(&self, request: RequestBuilder, model: &str) -> LlmResult<Response> {
        let response = self
            .authorized(request)?
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        Err(LlmError::from_status(status.as_u16(), text, model))
    }

    fn chat_body<'a>(request: &'a GenerationRequest, stream: bool) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &request.model,
            temperature: request.temperature,
            stream,
            messages,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &GenerationRequest) -> LlmResult<String> {
        debug!("Generating with model {}", request.model);
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::chat_body(request, false);

        let response = self
            .send(
                self.client.post(&url).json(&body).timeout(self.timeout),
                &request.model,
            )
            .await?;
        let parsed: ChatResponse = response.json().await?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    async fn stream(&self, request: &GenerationRequest) -> LlmResult<TokenStream> {
        debug!("Starting streaming generation with model {}", request.model);
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::chat_body(request, true);

        let response = self
            .send(self.client.post(&url).json(&body), &request.model)
            .await?;

        Ok(spawn_reader(
            response.bytes_stream(),
            parse_sse_line,
            self.timeout,
        ))
    }

    async fn list_models(&self) -> LlmResult<Vec<String>> {
        let url = format!("{}/models", self.base_url);
        debug!("Listing models from {}", url);

        let response = self.send(self.client.get(&url).timeout(self.timeout), "").await?;
        let list: ModelList = response.json().await?;

        Ok(chat_models(list.data.into_iter().map(|m| m.id)))
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed_batch(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingsRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response = self
            .send(
                self.client.post(&url).json(&body).timeout(self.timeout),
                &self.embedding_model,
            )
            .await?;
        let mut parsed: EmbeddingsResponse = response.json().await?;

        if parsed.data.len() != texts.len() {
            return Err(LlmError::ParseError(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);

        info!("Generated {} embeddings", parsed.data.len());
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Keep chat-capable model ids, sorted.
fn chat_models(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut models: Vec<String> = ids.filter(|id| id.starts_with(CHAT_MODEL_PREFIX)).collect();
    models.sort();
    models
}

/// Interpret one server-sent-event line of a chat completion stream.
fn parse_sse_line(line: &str) -> LineOutcome {
    let Some(data) = line.strip_prefix("data:") else {
        // Comments (": keep-alive") and event names carry no tokens
        return LineOutcome::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return LineOutcome::Done;
    }

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => {
            if let Some(error) = event.error {
                return LineOutcome::Failed(error.message);
            }
            match event
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
            {
                Some(token) if !token.is_empty() => LineOutcome::Token(token),
                _ => LineOutcome::Skip,
            }
        }
        Err(e) => {
            tracing::warn!("Failed to parse stream event: {}", e);
            LineOutcome::Skip
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_without_key() -> OpenAiClient {
        let mut client = OpenAiClient::from_config(&ModelConfig::default()).unwrap();
        client.api_key = None;
        client
    }

    #[test]
    fn test_parse_sse_tokens() {
        let line = r#"data: {"id":"c1","choices":[{"index":0,"delta":{"content":"Press"}}]}"#;
        assert_eq!(parse_sse_line(line), LineOutcome::Token("Press".to_string()));

        let role_only = r#"data: {"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(role_only), LineOutcome::Skip);
    }

    #[test]
    fn test_parse_sse_control_lines() {
        assert_eq!(parse_sse_line("data: [DONE]"), LineOutcome::Done);
        assert_eq!(parse_sse_line(": keep-alive"), LineOutcome::Skip);
        assert_eq!(
            parse_sse_line(r#"data: {"error":{"message":"server overloaded"}}"#),
            LineOutcome::Failed("server overloaded".to_string())
        );
    }

    #[test]
    fn test_chat_models_filtered_and_sorted() {
        let ids = ["whisper-1", "gpt-4o", "text-embedding-ada-002", "gpt-3.5-turbo-0125"]
            .into_iter()
            .map(String::from);
        assert_eq!(chat_models(ids), vec!["gpt-3.5-turbo-0125", "gpt-4o"]);
    }

    #[test]
    fn test_chat_body_includes_system() {
        let request = GenerationRequest::new("gpt-3.5-turbo-0125", "How do I drain the tank?")
            .with_system("Answer from the manual.");
        let json = serde_json::to_value(OpenAiClient::chat_body(&request, true)).unwrap();

        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "How do I drain the tank?");
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_error() {
        let client = client_without_key();
        let err = client.list_models().await.unwrap_err();
        assert_eq!(err.kind(), crate::GenerationErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_empty_batch_needs_no_request() {
        let client = client_without_key();
        assert!(client.embed_batch(&[]).await.unwrap().is_empty());
    }
}
