//! Error types for document ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while loading and chunking documents.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Parse error for {name}: {message}")]
    ParseError { name: String, message: String },

    #[error("No text could be extracted from {0}")]
    EmptyDocument(String),

    #[error("Invalid chunking configuration: {0}")]
    InvalidChunking(String),
}
