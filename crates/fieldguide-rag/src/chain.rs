//! Retrieval-augmented question answering over an embedding index.

use crate::error::{RagError, RagResult};
use crate::index::{EmbeddingIndex, SearchParams};
use crate::memory::{ConversationMemory, Exchange};
use crate::prompt::{build_condense_prompt, build_rag_prompt, build_system_prompt};
use fieldguide_config::Config;
use fieldguide_core::QueryResult;
use fieldguide_llm::{Embedder, GenerationErrorKind, GenerationRequest, LanguageModel, Providers};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Model and retrieval settings for one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSettings {
    pub model: String,
    pub temperature: f32,
    pub search: SearchParams,
    /// Rewrite follow-ups into standalone questions before retrieval.
    pub condense_question: bool,
}

impl ChainSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.model_id.clone(),
            temperature: config.model.temperature,
            search: SearchParams::from_config(&config.retrieval),
            condense_question: config.chat.condense_question,
        }
    }
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What one chain run produced. The exchange still has to be committed.
#[derive(Debug, Clone)]
pub struct ChainOutput {
    pub result: QueryResult,
    pub exchange: Exchange,
}

/// Condense, retrieve, prompt, and stream one answer.
#[derive(Clone)]
pub struct RetrievalChain {
    language_model: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    settings: ChainSettings,
}

impl RetrievalChain {
    pub fn new(providers: Providers, settings: ChainSettings) -> Self {
        Self {
            language_model: providers.language_model,
            embedder: providers.embedder,
            settings,
        }
    }

    pub fn settings(&self) -> &ChainSettings {
        &self.settings
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn language_model(&self) -> &dyn LanguageModel {
        self.language_model.as_ref()
    }

    /// Answer `question`, passing each token to `on_token` as it arrives.
    ///
    /// Memory is only read here; the returned exchange is committed by the caller.
    pub async fn run<F>(
        &self,
        index: &EmbeddingIndex,
        memory: &ConversationMemory,
        question: &str,
        mut on_token: F,
    ) -> RagResult<ChainOutput>
    where
        F: FnMut(&str) + Send,
    {
        let history = memory.render();

        let search_query = if self.settings.condense_question && !history.is_empty() {
            self.standalone_question(question, &history).await?
        } else {
            question.to_string()
        };

        let hits = index
            .search_text(&search_query, self.embedder.as_ref(), &self.settings.search)
            .await?;
        if hits.is_empty() {
            warn!("No context found for question; answering without excerpts");
        }
        let context: Vec<_> = hits.into_iter().map(|h| h.chunk).collect();

        let request = GenerationRequest::new(
            &self.settings.model,
            build_rag_prompt(question, &history, &context),
        )
        .with_system(build_system_prompt())
        .with_temperature(self.settings.temperature);

        let mut rx = self
            .language_model
            .stream(&request)
            .await
            .map_err(RagError::generation)?;

        let mut answer = String::new();
        while let Some(item) = rx.recv().await {
            let token = item.map_err(RagError::generation)?;
            on_token(&token);
            answer.push_str(&token);
        }

        if answer.trim().is_empty() {
            return Err(RagError::Generation {
                kind: GenerationErrorKind::Unknown,
                message: "model returned an empty answer".to_string(),
            });
        }

        info!(
            "Answered with {} characters from {} context chunks",
            answer.len(),
            context.len()
        );

        let exchange = memory.exchange(question, answer.clone());
        Ok(ChainOutput {
            result: QueryResult::new(answer, context),
            exchange,
        })
    }

    /// Ask the model for a standalone version of a follow-up question.
    async fn standalone_question(&self, question: &str, history: &str) -> RagResult<String> {
        let request = GenerationRequest::new(
            &self.settings.model,
            build_condense_prompt(question, history),
        )
        .with_temperature(self.settings.temperature);

        let rewritten = self
            .language_model
            .generate(&request)
            .await
            .map_err(RagError::generation)?;
        let rewritten = rewritten.trim();

        if rewritten.is_empty() {
            return Ok(question.to_string());
        }
        debug!("Condensed question: {}", rewritten);
        Ok(rewritten.to_string())
    }
}
