//! Deterministic providers for unit tests.

use async_trait::async_trait;
use fieldguide_llm::{
    Embedder, GenerationRequest, LanguageModel, LlmError, LlmResult, TokenStream,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

pub(crate) const DIMENSION: usize = 64;

/// Hashed bag-of-words vectors: texts sharing words point the same way.
#[derive(Default)]
pub(crate) struct HashEmbedder {
    pub calls: AtomicUsize,
}

pub(crate) fn hash_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.to_lowercase().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % DIMENSION as u64) as usize] += 1.0;
    }
    vector
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }
}

/// Always fails, as an embedder with a revoked key would.
pub(crate) struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        Err(LlmError::Authentication("invalid api key".into()))
    }
}

/// Returns vectors of a fixed dimension regardless of input.
pub(crate) struct FixedDimEmbedder(pub usize);

#[async_trait]
impl Embedder for FixedDimEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0; self.0]).collect())
    }
}

/// What the scripted model does once its tokens are sent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Ending {
    Finish,
    FailAuth,
    /// Connection closes before the completion marker.
    Truncate,
    Hang,
}

/// Streams a fixed answer and records every request it receives.
pub(crate) struct ScriptedModel {
    tokens: Vec<String>,
    ending: Ending,
    rewrite: String,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn answering(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ending: Ending::Finish,
            rewrite: "standalone question".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn ending(mut self, ending: Ending) -> Self {
        self.ending = ending;
        self
    }

    pub fn rewriting_to(mut self, rewrite: &str) -> Self {
        self.rewrite = rewrite.to_string();
        self
    }

    pub fn recorded(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> LlmResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.rewrite.clone())
    }

    async fn stream(&self, request: &GenerationRequest) -> LlmResult<TokenStream> {
        self.requests.lock().unwrap().push(request.clone());

        let (tx, rx) = mpsc::channel(100);
        let tokens = self.tokens.clone();
        let ending = self.ending;
        tokio::spawn(async move {
            for token in tokens {
                if tx.send(Ok(token)).await.is_err() {
                    return;
                }
            }
            match ending {
                Ending::Finish => {}
                Ending::FailAuth => {
                    let _ = tx
                        .send(Err(LlmError::Authentication("key revoked".into())))
                        .await;
                }
                Ending::Truncate => {
                    let _ = tx
                        .send(Err(LlmError::Stream(
                            "stream ended before completion".into(),
                        )))
                        .await;
                }
                Ending::Hang => {
                    tx.closed().await;
                }
            }
        });
        Ok(rx)
    }

    async fn list_models(&self) -> LlmResult<Vec<String>> {
        Ok(vec!["scripted-1".to_string()])
    }
}
