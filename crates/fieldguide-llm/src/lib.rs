//! Fieldguide LLM - language model and embedding providers.
//!
//! This crate provides async clients for Ollama and OpenAI behind the
//! [`LanguageModel`] and [`Embedder`] traits, including token streaming.

mod client;
mod error;
mod openai;
mod provider;
mod stream;
mod types;

pub use client::OllamaClient;
pub use error::{GenerationErrorKind, LlmError, LlmResult};
pub use openai::OpenAiClient;
pub use provider::{Embedder, LanguageModel, Providers};
pub use stream::TokenStream;
pub use types::*;
