//! Plain text document parser.

use super::{decode_utf8, DocumentParser};
use crate::error::IngestResult;
use fieldguide_core::Page;

/// Form feed, the conventional page separator in plain-text exports.
const PAGE_BREAK: char = '\x0C';

/// Parser for plain text files. Form feeds split pages.
pub struct TextParser;

impl TextParser {
    /// Create a new text parser.
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for TextParser {
    fn load_pages(&self, name: &str, bytes: &[u8]) -> IngestResult<Vec<Page>> {
        let content = decode_utf8(name, bytes)?;

        Ok(content
            .split(PAGE_BREAK)
            .enumerate()
            .map(|(i, text)| Page::new(name, i as u32 + 1, text))
            .collect())
    }

    fn extensions(&self) -> &[&str] {
        &["txt", "text", "log", "csv", "rst", "org"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;

    #[test]
    fn test_single_page() {
        let pages = TextParser::new()
            .load_pages("notes.txt", b"This is a plain text file.\nWith multiple lines.")
            .unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].source, "notes.txt");
        assert!(pages[0].text.contains("plain text file"));
    }

    #[test]
    fn test_form_feed_splits_pages() {
        let pages = TextParser::new()
            .load_pages("manual.txt", "Intro\x0CInstallation\x0CMaintenance".as_bytes())
            .unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].number, 2);
        assert_eq!(pages[1].text, "Installation");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = TextParser::new()
            .load_pages("bad.txt", &[0xff, 0xfe, 0x00])
            .unwrap_err();
        assert!(matches!(err, IngestError::ParseError { .. }));
    }
}
