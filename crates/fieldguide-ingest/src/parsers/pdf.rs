//! PDF document parser.

use super::DocumentParser;
use crate::error::{IngestError, IngestResult};
use fieldguide_core::Page;
use tracing::debug;

/// Parser for PDF files.
pub struct PdfParser;

impl PdfParser {
    /// Create a new PDF parser.
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for PdfParser {
    fn load_pages(&self, name: &str, bytes: &[u8]) -> IngestResult<Vec<Page>> {
        debug!("Parsing PDF: {}", name);

        // pdf-extract panics on some malformed files instead of returning an error
        let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|_| IngestError::ParseError {
                name: name.to_string(),
                message: "PDF extractor panicked on malformed input".to_string(),
            })?
            .map_err(|e| IngestError::ParseError {
                name: name.to_string(),
                message: format!("Failed to extract text from PDF: {}", e),
            })?;

        let pages: Vec<Page> = extracted
            .iter()
            .enumerate()
            .map(|(i, text)| Page::new(name, i as u32 + 1, clean_pdf_text(text)))
            .collect();

        debug!("Extracted {} pages from {}", pages.len(), name);

        Ok(pages)
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

/// Clean up extracted PDF text.
fn clean_pdf_text(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        // Collapse runs of empty lines into one
        .fold(Vec::new(), |mut acc, line| {
            let last_was_empty = acc.last().map(|s: &String| s.is_empty()).unwrap_or(false);
            if !(line.is_empty() && last_was_empty) {
                acc.push(line.to_string());
            }
            acc
        })
        .join("\n")
        .trim()
        .to_string()
}
