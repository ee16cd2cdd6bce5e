//! Error types for the retrieval pipeline.

use fieldguide_ingest::IngestError;
use fieldguide_llm::{GenerationErrorKind, LlmError};
use thiserror::Error;

/// Result type for retrieval pipeline operations.
pub type RagResult<T> = Result<T, RagError>;

/// Errors surfaced by the index, the chain, and the session.
#[derive(Error, Debug)]
pub enum RagError {
    /// A document could not be loaded or chunked.
    #[error("Ingestion failed: {0}")]
    Ingestion(#[from] IngestError),

    /// The embedder failed or returned unusable vectors.
    #[error("Embedding failed ({kind}): {message}")]
    Embedding {
        kind: GenerationErrorKind,
        message: String,
    },

    /// The index could not answer a search.
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// The language model failed before the answer was complete.
    #[error("Generation failed ({kind}): {message}")]
    Generation {
        kind: GenerationErrorKind,
        message: String,
    },

    /// An exchange could not be committed to memory.
    #[error("Conversation memory is inconsistent: {0}")]
    MemoryConsistency(String),

    /// `ask` was called before any documents were indexed.
    #[error("No documents have been indexed yet")]
    NotInitialized,

    /// Another query is still running on this session.
    #[error("A query is already in progress")]
    Busy,

    /// Invalid pipeline settings.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    pub fn embedding(e: LlmError) -> Self {
        RagError::Embedding {
            kind: e.kind(),
            message: e.to_string(),
        }
    }

    pub fn generation(e: LlmError) -> Self {
        RagError::Generation {
            kind: e.kind(),
            message: e.to_string(),
        }
    }

    /// Failure category for provider errors.
    pub fn kind(&self) -> Option<GenerationErrorKind> {
        match self {
            RagError::Embedding { kind, .. } | RagError::Generation { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_keeps_kind() {
        let err = RagError::generation(LlmError::Authentication("bad key".into()));
        assert_eq!(err.kind(), Some(GenerationErrorKind::Auth));
        assert!(err.to_string().contains("auth"));
    }

    #[test]
    fn test_ingestion_from() {
        let err: RagError = IngestError::UnsupportedFileType("dwg".into()).into();
        assert!(matches!(err, RagError::Ingestion(_)));
        assert_eq!(err.kind(), None);
    }
}
