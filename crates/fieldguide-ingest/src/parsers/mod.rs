//! Page loaders for the supported document kinds.

mod markdown;
mod pdf;
mod text;

pub use markdown::MarkdownParser;
pub use pdf::PdfParser;
pub use text::TextParser;

use crate::error::{IngestError, IngestResult};
use fieldguide_core::Page;

/// Trait for document parsers.
pub trait DocumentParser: Send + Sync {
    /// Turn raw document bytes into ordered pages attributed to `name`.
    fn load_pages(&self, name: &str, bytes: &[u8]) -> IngestResult<Vec<Page>>;

    /// Get the supported file extensions.
    fn extensions(&self) -> &[&str];

    /// Check if this parser supports the given extension.
    fn supports(&self, extension: &str) -> bool {
        self.extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Markdown,
}

impl DocumentKind {
    /// All kinds, in detection order.
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Pdf, DocumentKind::Markdown, DocumentKind::Text];

    /// Detect the kind from a file name's extension.
    pub fn from_name(name: &str) -> IngestResult<Self> {
        let extension = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        Self::ALL
            .into_iter()
            .find(|kind| kind.parser().supports(extension))
            .ok_or_else(|| {
                IngestError::UnsupportedFileType(if extension.is_empty() {
                    name.to_string()
                } else {
                    extension.to_string()
                })
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "text",
            DocumentKind::Markdown => "markdown",
        }
    }

    fn parser(&self) -> Box<dyn DocumentParser> {
        match self {
            DocumentKind::Pdf => Box::new(PdfParser::new()),
            DocumentKind::Text => Box::new(TextParser::new()),
            DocumentKind::Markdown => Box::new(MarkdownParser::new()),
        }
    }

    /// Load the pages of a document of this kind.
    pub fn load(&self, name: &str, bytes: &[u8]) -> IngestResult<Vec<Page>> {
        self.parser().load_pages(name, bytes)
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decode bytes as UTF-8, attributing failures to the document name.
fn decode_utf8(name: &str, bytes: &[u8]) -> IngestResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| IngestError::ParseError {
        name: name.to_string(),
        message: format!("not valid UTF-8: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_detection() {
        assert_eq!(DocumentKind::from_name("manual.PDF").unwrap(), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_name("docs/notes.md").unwrap(), DocumentKind::Markdown);
        assert_eq!(DocumentKind::from_name("log.txt").unwrap(), DocumentKind::Text);
    }

    #[test]
    fn test_unsupported_kind() {
        let err = DocumentKind::from_name("photo.png").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFileType(ext) if ext == "png"));

        let err = DocumentKind::from_name("README").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFileType(name) if name == "README"));
    }
}
