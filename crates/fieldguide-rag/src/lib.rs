//! Fieldguide RAG - retrieval-augmented question answering over manuals.
//!
//! Documents are chunked and embedded into an in-memory [`EmbeddingIndex`].
//! A [`RetrievalChain`] retrieves context for each question and streams the
//! model's answer, and a [`SessionController`] ties index, memory, and chain
//! together for one conversation.

mod chain;
mod error;
mod index;
mod memory;
pub mod prompt;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{ChainOutput, ChainSettings, RetrievalChain};
pub use error::{RagError, RagResult};
pub use index::{cosine_similarity, EmbeddingIndex, ScoredChunk, SearchParams};
pub use memory::{ConversationMemory, Exchange};
pub use session::{
    with_history, InitOutcome, SessionController, SessionState, SharedSession, DEFAULT_GREETING,
};
