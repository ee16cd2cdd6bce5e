//! Session lifecycle: index documents once, answer questions, keep history.

use crate::chain::{ChainSettings, RetrievalChain};
use crate::error::{RagError, RagResult};
use crate::index::EmbeddingIndex;
use crate::memory::ConversationMemory;
use fieldguide_config::Config;
use fieldguide_core::{new_id, ConversationTurn, DocumentId, QueryResult, SessionId};
use fieldguide_ingest::{ChunkConfig, Ingestor, RawDocument};
use fieldguide_llm::Providers;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Greeting shown at the top of every new transcript.
pub const DEFAULT_GREETING: &str = "How can I help you?";

/// Presentation state owned by the caller.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: SessionId,
    /// Messages as displayed, greeting first.
    pub transcript: Vec<ConversationTurn>,
    /// View the transcript belongs to.
    pub view: Option<String>,
    /// Content ids of the documents currently indexed.
    pub loaded_documents: BTreeSet<DocumentId>,
    greeting: String,
}

impl SessionState {
    pub fn new(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            session_id: new_id(),
            transcript: vec![ConversationTurn::assistant(greeting.clone())],
            view: None,
            loaded_documents: BTreeSet::new(),
            greeting,
        }
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Drop every message except a fresh greeting.
    pub fn reset_transcript(&mut self) {
        self.transcript = vec![ConversationTurn::assistant(self.greeting.clone())];
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}

/// Run `handler` for `view` with its chat history in place.
///
/// Switching views starts a fresh transcript. The transcript is replayed
/// through `display` before `handler` runs.
pub fn with_history<H, D, T>(state: &mut SessionState, view: &str, handler: H, mut display: D) -> T
where
    H: FnOnce(&mut SessionState) -> T,
    D: FnMut(&ConversationTurn),
{
    if state.view.as_deref() != Some(view) {
        debug!("Switching view to {}", view);
        state.view = Some(view.to_string());
        state.reset_transcript();
    }
    if state.transcript.is_empty() {
        state.reset_transcript();
    }

    for turn in &state.transcript {
        display(turn);
    }

    handler(state)
}

/// Result of [`SessionController::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Same documents as before; the existing index was kept.
    Reused,
    /// A new index was built.
    Rebuilt { documents: usize, chunks: usize },
}

/// Owns the index, the memory, and the chain for one session.
pub struct SessionController {
    ingestor: Ingestor,
    chain: RetrievalChain,
    index: Option<EmbeddingIndex>,
    memory: ConversationMemory,
    document_ids: BTreeSet<DocumentId>,
}

impl SessionController {
    pub fn new(ingestor: Ingestor, chain: RetrievalChain, history_turns: usize) -> Self {
        Self {
            ingestor,
            chain,
            index: None,
            memory: ConversationMemory::new(history_turns),
            document_ids: BTreeSet::new(),
        }
    }

    /// Build a controller from configuration using the given providers.
    pub fn from_config(config: &Config, providers: Providers) -> RagResult<Self> {
        let ingestor = Ingestor::new(ChunkConfig::from_chunking_config(&config.chunking))?;
        let chain = RetrievalChain::new(providers, ChainSettings::from_config(config));
        Ok(Self::new(ingestor, chain, config.chat.history_turns))
    }

    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    pub fn index(&self) -> Option<&EmbeddingIndex> {
        self.index.as_ref()
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn chain(&self) -> &RetrievalChain {
        &self.chain
    }

    pub fn document_ids(&self) -> &BTreeSet<DocumentId> {
        &self.document_ids
    }

    /// Index `documents`, unless exactly these documents are already indexed.
    ///
    /// A rebuild clears conversation memory and the caller's transcript. If
    /// loading or embedding fails, the previous index and memory stay in place.
    pub async fn initialize(
        &mut self,
        state: &mut SessionState,
        documents: &[RawDocument],
    ) -> RagResult<InitOutcome> {
        if documents.is_empty() {
            return Err(RagError::Config("no documents to index".to_string()));
        }

        let ids: BTreeSet<DocumentId> = documents.iter().map(|d| d.id()).collect();
        if self.index.is_some() && ids == self.document_ids {
            debug!("Document set unchanged; reusing index");
            return Ok(InitOutcome::Reused);
        }

        let corpus = self.ingestor.prepare(documents)?;
        let mut index = EmbeddingIndex::new();
        index.add(&corpus.chunks, self.chain.embedder()).await?;

        let outcome = InitOutcome::Rebuilt {
            documents: corpus.documents.len(),
            chunks: index.len(),
        };
        info!(
            "Indexed {} documents into {} chunks",
            corpus.documents.len(),
            index.len()
        );

        self.index = Some(index);
        self.document_ids = ids.clone();
        self.memory.clear();
        state.loaded_documents = ids;
        state.reset_transcript();

        Ok(outcome)
    }

    /// Answer one question, streaming tokens to `on_token`.
    ///
    /// Memory and transcript change only after the full answer arrived.
    pub async fn ask<F>(
        &mut self,
        state: &mut SessionState,
        question: &str,
        on_token: F,
    ) -> RagResult<QueryResult>
    where
        F: FnMut(&str) + Send,
    {
        let index = self.index.as_ref().ok_or(RagError::NotInitialized)?;

        let output = self.chain.run(index, &self.memory, question, on_token).await?;
        self.memory.commit(output.exchange)?;

        state.transcript.push(ConversationTurn::user(question));
        state
            .transcript
            .push(ConversationTurn::assistant(output.result.answer.clone()));

        Ok(output.result)
    }
}

/// A controller shared between tasks. One query runs at a time.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<SessionController>>,
}

impl SharedSession {
    pub fn new(controller: SessionController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    /// Wait for exclusive access.
    pub async fn lock(&self) -> MutexGuard<'_, SessionController> {
        self.inner.lock().await
    }

    pub async fn initialize(
        &self,
        state: &mut SessionState,
        documents: &[RawDocument],
    ) -> RagResult<InitOutcome> {
        self.inner.lock().await.initialize(state, documents).await
    }

    /// Like [`SessionController::ask`], but fails with [`RagError::Busy`]
    /// instead of queueing behind a running query.
    pub async fn ask<F>(
        &self,
        state: &mut SessionState,
        question: &str,
        on_token: F,
    ) -> RagResult<QueryResult>
    where
        F: FnMut(&str) + Send,
    {
        let mut controller = self.inner.try_lock().map_err(|_| RagError::Busy)?;
        controller.ask(state, question, on_token).await
    }
}
