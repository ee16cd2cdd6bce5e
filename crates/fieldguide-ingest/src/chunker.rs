//! Page chunking for retrieval.
//!
//! Pages are cut into windows of at most `chunk_size` characters. Neighbouring
//! windows of the same page share exactly `chunk_overlap` characters, so a page
//! can be rebuilt by appending each chunk minus its leading overlap. Cuts prefer
//! paragraph breaks, then line breaks, then spaces.

use crate::error::{IngestError, IngestResult};
use fieldguide_core::{Chunk, Document, Page};

/// Separators tried, in order, when looking for a natural cut.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum size of each chunk in characters.
    pub chunk_size: usize,
    /// Number of characters shared by adjacent chunks of a page.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2500,
            chunk_overlap: 150,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Create config from the `[chunking]` settings.
    pub fn from_chunking_config(config: &fieldguide_config::ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn validate(&self) -> IngestResult<()> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunking(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits pages into overlapping chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    /// Create a new chunker, rejecting configurations that cannot make progress.
    pub fn new(config: ChunkConfig) -> IngestResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Chunk every page of every document, preserving order.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|d| self.chunk_pages(&d.pages))
            .collect()
    }

    /// Chunk a sequence of pages, preserving order.
    pub fn chunk_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        pages.iter().flat_map(|p| self.chunk_page(p)).collect()
    }

    /// Chunk a single page. Blank pages yield nothing; pages that fit yield one chunk.
    pub fn chunk_page(&self, page: &Page) -> Vec<Chunk> {
        if page.text.trim().is_empty() {
            return vec![];
        }

        let chars: Vec<char> = page.text.chars().collect();
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut index = 0u32;

        loop {
            let hard_end = (start + size).min(chars.len());
            let end = if hard_end == chars.len() {
                hard_end
            } else {
                // The cut must leave more than `overlap` characters so the next start advances
                find_break(&chars, start + overlap + 1, hard_end).unwrap_or(hard_end)
            };

            let text: String = chars[start..end].iter().collect();
            chunks.push(Chunk::new(page.source.clone(), page.number, index, start, text));

            if end == chars.len() {
                break;
            }
            start = end - overlap;
            index += 1;
        }

        chunks
    }
}

/// Latest position in `lo..=hi` that sits right after a separator,
/// trying separators in priority order.
fn find_break(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    for sep in SEPARATORS {
        let sep: Vec<char> = sep.chars().collect();
        let found = (lo..=hi)
            .rev()
            .find(|&end| end >= sep.len() && chars[end - sep.len()..end] == sep[..]);
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Rebuild page texts from chunks by dropping each follow-up chunk's overlap.
pub fn reassemble(chunks: &[Chunk], overlap: usize) -> Vec<String> {
    let mut pages: Vec<String> = Vec::new();
    let mut previous: Option<(&str, u32)> = None;

    for chunk in chunks {
        let key = (chunk.source.as_str(), chunk.page);
        if previous == Some(key) {
            if let Some(current) = pages.last_mut() {
                current.extend(chunk.text.chars().skip(overlap));
            }
        } else {
            pages.push(chunk.text.clone());
        }
        previous = Some(key);
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkConfig::new(size, overlap)).unwrap()
    }

    /// Deterministic prose with paragraph and line breaks.
    fn sample_text(words: usize, seed: usize) -> String {
        const VOCAB: [&str; 12] = [
            "compressor", "valve", "pressure", "drain", "the", "check", "oil", "filter",
            "safety", "switch", "motor", "日本語",
        ];
        let mut text = String::new();
        for i in 0..words {
            let w = VOCAB[(i * 7 + seed * 3 + i / 5) % VOCAB.len()];
            text.push_str(w);
            text.push(match (i + seed) % 23 {
                0 => '\n',
                11 => '.',
                _ => ' ',
            });
            if (i + seed) % 41 == 0 {
                text.push_str("\n\n");
            }
        }
        text
    }

    #[test]
    fn test_short_page_single_chunk() {
        let page = Page::new("manual.pdf", 1, "  Keep the area around the unit clear.  ");
        let chunks = chunker(2500, 150).chunk_page(&page);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, page.text);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks[0].source, "manual.pdf");
    }

    #[test]
    fn test_blank_page_yields_nothing() {
        let c = chunker(100, 10);
        assert!(c.chunk_page(&Page::new("m.pdf", 1, "")).is_empty());
        assert!(c.chunk_page(&Page::new("m.pdf", 2, " \n\t ")).is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Chunker::new(ChunkConfig::new(0, 0)).is_err());
        assert!(Chunker::new(ChunkConfig::new(100, 100)).is_err());
        assert!(Chunker::new(ChunkConfig::new(100, 150)).is_err());
        assert!(Chunker::new(ChunkConfig::new(1, 0)).is_ok());
    }

    #[test]
    fn test_size_bound_and_exact_overlap() {
        for (size, overlap) in [(50, 10), (80, 0), (120, 30), (64, 63), (2500, 150)] {
            let c = chunker(size, overlap);
            for seed in 0..5 {
                let page = Page::new("manual.pdf", 3, sample_text(400, seed));
                let chunks = c.chunk_page(&page);
                assert!(!chunks.is_empty());

                for chunk in &chunks {
                    assert!(chunk.len_chars() <= size, "chunk of {} > {}", chunk.len_chars(), size);
                }

                for pair in chunks.windows(2) {
                    let prev: Vec<char> = pair[0].text.chars().collect();
                    let next: Vec<char> = pair[1].text.chars().collect();
                    let suffix = &prev[prev.len() - overlap..];
                    assert_eq!(suffix, &next[..overlap]);
                    assert_eq!(pair[1].offset, pair[0].offset + prev.len() - overlap);
                    assert_eq!(pair[1].chunk_index, pair[0].chunk_index + 1);
                }
            }
        }
    }

    #[test]
    fn test_reassemble_reconstructs_pages() {
        let pages: Vec<Page> = (1..=3)
            .map(|n| Page::new("manual.pdf", n, sample_text(300 + n as usize * 50, n as usize)))
            .collect();

        for (size, overlap) in [(40, 5), (100, 20), (333, 0)] {
            let chunks = chunker(size, overlap).chunk_pages(&pages);
            let rebuilt = reassemble(&chunks, overlap);

            let expected: Vec<String> = pages.iter().map(|p| p.text.clone()).collect();
            assert_eq!(rebuilt, expected);
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = chunker(50, 5).chunk_page(&Page::new("m.txt", 1, text));

        assert!(chunks[0].text.ends_with("\n\n"));
        assert_eq!(chunks[0].len_chars(), 32);
    }

    #[test]
    fn test_text_without_separators_is_cut_hard() {
        let text = "x".repeat(250);
        let chunks = chunker(100, 10).chunk_page(&Page::new("m.txt", 1, text));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len_chars(), 100);
        assert_eq!(chunks[1].offset, 90);
        assert_eq!(chunks[2].offset, 180);
    }

    #[test]
    fn test_deterministic_and_ordered() {
        let c = chunker(60, 12);
        let doc = Document::new(
            "hash",
            "manual.pdf",
            vec![
                Page::new("manual.pdf", 1, sample_text(100, 1)),
                Page::new("manual.pdf", 2, sample_text(100, 2)),
            ],
        );

        let first = c.chunk_documents(std::slice::from_ref(&doc));
        let second = c.chunk_documents(std::slice::from_ref(&doc));
        assert_eq!(first, second);

        let pages: Vec<u32> = first.iter().map(|c| c.page).collect();
        let mut sorted = pages.clone();
        sorted.sort();
        assert_eq!(pages, sorted);
    }

    #[test]
    fn test_utf8_text() {
        let text = "Hello ─── World! This has unicode: 日本語 and more ─ content here.".repeat(4);
        let chunks = chunker(50, 10).chunk_page(&Page::new("m.txt", 1, text.clone()));

        assert!(chunks.len() > 1);
        assert_eq!(reassemble(&chunks, 10), vec![text]);
    }
}
