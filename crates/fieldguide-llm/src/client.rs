//! Ollama HTTP client.

use crate::error::{LlmError, LlmResult};
use crate::provider::{Embedder, LanguageModel};
use crate::stream::{spawn_reader, LineOutcome, TokenStream};
use crate::types::*;
use async_trait::async_trait;
use fieldguide_config::ModelConfig;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, info};

/// Client for interacting with Ollama's API.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    timeout: Duration,
    embedding_model: String,
}

impl OllamaClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &ModelConfig) -> LlmResult<Self> {
        Self::with_timeout(
            config.resolved_host(),
            config.embedding_model.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    /// Create a new client with default settings.
    pub fn new(host: impl Into<String>, embedding_model: impl Into<String>) -> LlmResult<Self> {
        Self::with_timeout(host, embedding_model, Duration::from_secs(120))
    }

    /// `timeout` bounds connecting and each whole non-streaming request.
    /// Streaming generations are bounded per read instead.
    fn with_timeout(
        host: impl Into<String>,
        embedding_model: impl Into<String>,
        timeout: Duration,
    ) -> LlmResult<Self> {
        let host = host.into();
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            timeout,
            embedding_model: embedding_model.into(),
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::Unreachable {
                host: self.host.clone(),
                message: "Ollama server is not running. Start it with 'ollama serve'.".to_string(),
            }
        } else if e.is_timeout() {
            LlmError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            LlmError::Http(e)
        }
    }

    /// Turn a non-success response into an error.
    async fn check(response: Response, model: &str) -> LlmResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(LlmError::from_status(status.as_u16(), text, model))
    }

    /// List all locally available models.
    pub async fn list_model_info(&self) -> LlmResult<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.host);
        debug!("Listing models from {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = Self::check(response, "").await?;

        let list: ListModelsResponse = response.json().await?;
        Ok(list.models)
    }

    /// Generate an embedding for one text.
    async fn embed_one(&self, text: &str) -> LlmResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.host);
        debug!(
            "Generating embedding with model {} for text length {}",
            self.embedding_model,
            text.len()
        );

        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = Self::check(response, &self.embedding_model).await?;

        let embedding_response: EmbeddingResponse = response.json().await?;
        Ok(embedding_response.embedding)
    }

    async fn post_generate(&self, request: GenerateRequest) -> LlmResult<Response> {
        let url = format!("{}/api/generate", self.host);
        let model = request.model.clone();

        let mut builder = self.client.post(&url).json(&request);
        if !request.stream {
            builder = builder.timeout(self.timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::check(response, &model).await
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed_batch(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for text in texts {
            let embedding = self.embed_one(text).await?;
            if let Some(first) = embeddings.first() {
                let expected = first.len();
                if embedding.len() != expected {
                    return Err(LlmError::DimensionMismatch {
                        expected,
                        actual: embedding.len(),
                    });
                }
            }
            embeddings.push(embedding);
        }

        info!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: &GenerationRequest) -> LlmResult<String> {
        debug!("Generating with model {}", request.model);
        let response = self.post_generate(GenerateRequest::from(request)).await?;
        let generate_response: GenerateResponse = response.json().await?;
        Ok(generate_response.response)
    }

    async fn stream(&self, request: &GenerationRequest) -> LlmResult<TokenStream> {
        debug!("Starting streaming generation with model {}", request.model);

        let mut wire = GenerateRequest::from(request);
        wire.stream = true;
        let response = self.post_generate(wire).await?;

        Ok(spawn_reader(
            response.bytes_stream(),
            parse_stream_line,
            self.timeout,
        ))
    }

    async fn list_models(&self) -> LlmResult<Vec<String>> {
        let mut names: Vec<String> = self
            .list_model_info()
            .await?
            .into_iter()
            .map(|m| m.name)
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Interpret one JSON line of an Ollama generate stream.
fn parse_stream_line(line: &str) -> LineOutcome {
    match serde_json::from_str::<StreamChunk>(line) {
        Ok(chunk) => {
            if let Some(error) = chunk.error {
                LineOutcome::Failed(error)
            } else if chunk.done && !chunk.response.is_empty() {
                LineOutcome::Final(chunk.response)
            } else if !chunk.response.is_empty() {
                LineOutcome::Token(chunk.response)
            } else if chunk.done {
                LineOutcome::Done
            } else {
                LineOutcome::Skip
            }
        }
        Err(e) => {
            tracing::warn!("Failed to parse stream chunk: {}", e);
            LineOutcome::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldguide_config::ProviderKind;

    #[test]
    fn test_client_creation() {
        let config = ModelConfig {
            provider: ProviderKind::Ollama,
            host: Some("http://localhost:11434/".to_string()),
            ..ModelConfig::default()
        };
        let client = OllamaClient::from_config(&config).unwrap();
        assert_eq!(client.host, "http://localhost:11434");
        assert_eq!(client.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_parse_stream_lines() {
        assert_eq!(
            parse_stream_line(r#"{"model":"llama3","response":"Hi","done":false}"#),
            LineOutcome::Token("Hi".to_string())
        );
        assert_eq!(
            parse_stream_line(r#"{"model":"llama3","response":"","done":true}"#),
            LineOutcome::Done
        );
        assert_eq!(
            parse_stream_line(r#"{"error":"out of memory"}"#),
            LineOutcome::Failed("out of memory".to_string())
        );
        assert_eq!(
            parse_stream_line(r#"{"model":"llama3","response":".","done":true}"#),
            LineOutcome::Final(".".to_string())
        );
        assert_eq!(parse_stream_line("not json"), LineOutcome::Skip);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) is closed on test machines
        let client = OllamaClient::new("http://127.0.0.1:9", "nomic-embed-text").unwrap();
        let err = client.embed("hello").await.unwrap_err();
        assert_eq!(err.kind(), crate::GenerationErrorKind::Network);
    }
}
