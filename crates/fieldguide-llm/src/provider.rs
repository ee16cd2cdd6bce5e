//! Provider contracts used by the retrieval chain.

use crate::client::OllamaClient;
use crate::error::{LlmError, LlmResult};
use crate::openai::OpenAiClient;
use crate::stream::TokenStream;
use crate::types::GenerationRequest;
use async_trait::async_trait;
use fieldguide_config::{ModelConfig, ProviderKind};
use std::sync::Arc;
use tracing::info;

/// A chat/completion model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Generate a full completion.
    async fn generate(&self, request: &GenerationRequest) -> LlmResult<String>;

    /// Generate a completion as a stream of tokens.
    async fn stream(&self, request: &GenerationRequest) -> LlmResult<TokenStream>;

    /// Chat models the provider offers.
    async fn list_models(&self) -> LlmResult<Vec<String>>;
}

/// Turns text into fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed several texts, returning one vector per input in the same order.
    async fn embed_batch(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError("provider returned no embedding".to_string()))
    }
}

/// The language model and embedder selected by configuration.
#[derive(Clone)]
pub struct Providers {
    pub language_model: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
}

impl Providers {
    /// Build the configured backend. OpenAI requires an API key up front.
    pub fn from_config(config: &ModelConfig) -> LlmResult<Self> {
        info!(
            "Using {} (model {}, embeddings {})",
            config.provider, config.model_id, config.embedding_model
        );

        match config.provider {
            ProviderKind::Ollama => {
                let client = Arc::new(OllamaClient::from_config(config)?);
                Ok(Self {
                    language_model: client.clone(),
                    embedder: client,
                })
            }
            ProviderKind::OpenAi => {
                let client = Arc::new(OpenAiClient::from_config(config)?);
                Ok(Self {
                    language_model: client.clone(),
                    embedder: client,
                })
            }
        }
    }
}
