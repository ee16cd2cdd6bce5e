//! Core domain types for Fieldguide.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Content hash identifying a loaded document (hex SHA-256 of its bytes).
pub type DocumentId = String;

/// Content hash identifying a chunk.
pub type ChunkId = String;

/// Unique identifier for chat sessions.
pub type SessionId = String;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Hex-encoded SHA-256 of the given bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// A single page of extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Name of the document this page belongs to (usually the filename).
    pub source: String,
    /// Page number, starting at 1.
    pub number: u32,
    pub text: String,
}

impl Page {
    pub fn new(source: impl Into<String>, number: u32, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            number,
            text: text.into(),
        }
    }
}

/// A loaded document: its name, content hash and ordered pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, name: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pages,
        }
    }

    /// Total number of characters across all pages.
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// A bounded slice of a page, the unit of embedding and citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source: String,
    pub page: u32,
    /// Position of this chunk within its page.
    pub chunk_index: u32,
    /// Character offset of the chunk start within the page text.
    pub offset: usize,
    pub text: String,
}

impl Chunk {
    /// Create a chunk. The id is derived from its source, position and text,
    /// so the same slice of the same page always gets the same id.
    pub fn new(
        source: impl Into<String>,
        page: u32,
        chunk_index: u32,
        offset: usize,
        text: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let text = text.into();
        let id = content_hash(format!("{}\u{0}{}\u{0}{}\u{0}{}", source, page, offset, text).as_bytes());
        Self {
            id,
            source,
            page,
            chunk_index,
            offset,
            text,
        }
    }

    /// Number of characters in the chunk text.
    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A citation shown next to an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCitation {
    /// File name without directories.
    pub filename: String,
    pub page: u32,
    pub excerpt: String,
}

/// Result of answering one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    /// Chunks that were given to the model as context, in retrieval order.
    pub source_chunks: Vec<Chunk>,
}

impl QueryResult {
    pub fn new(answer: impl Into<String>, source_chunks: Vec<Chunk>) -> Self {
        Self {
            answer: answer.into(),
            source_chunks,
        }
    }

    /// Citations for the source chunks, with excerpts capped at `max_excerpt` characters.
    pub fn citations(&self, max_excerpt: usize) -> Vec<SourceCitation> {
        self.source_chunks
            .iter()
            .map(|c| SourceCitation {
                filename: base_name(&c.source).to_string(),
                page: c.page,
                excerpt: truncate_content(&c.text, max_excerpt),
            })
            .collect()
    }
}

/// Serialize a transcript as pretty JSON.
pub fn transcript_to_json(turns: &[ConversationTurn]) -> Result<String> {
    Ok(serde_json::to_string_pretty(turns)?)
}

/// Write a transcript as pretty JSON to `path`, creating parent directories.
pub fn save_transcript(path: &std::path::Path, turns: &[ConversationTurn]) -> Result<()> {
    let contents = transcript_to_json(turns)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Final path component of a source name.
pub fn base_name(source: &str) -> &str {
    source
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(source)
}

/// Truncate content to a maximum number of characters, adding ellipsis if needed.
pub fn truncate_content(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
