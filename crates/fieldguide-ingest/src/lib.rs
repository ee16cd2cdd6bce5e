//! Fieldguide Ingest - Document loading and chunking.
//!
//! This crate provides:
//! - Page-level loaders for PDF, plain text and Markdown documents
//! - Overlapping, size-bounded chunking of pages for retrieval

mod chunker;
mod error;
mod ingestor;
mod parsers;

pub use chunker::{reassemble, ChunkConfig, Chunker};
pub use error::{IngestError, IngestResult};
pub use ingestor::{Ingestor, PreparedCorpus, RawDocument};
pub use parsers::{DocumentKind, DocumentParser, MarkdownParser, PdfParser, TextParser};
