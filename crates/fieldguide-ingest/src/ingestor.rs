//! Document loading and chunking.

use crate::chunker::{ChunkConfig, Chunker};
use crate::error::{IngestError, IngestResult};
use crate::parsers::DocumentKind;
use fieldguide_core::{content_hash, Chunk, Document, DocumentId};
use std::path::Path;
use tracing::{debug, info, warn};

/// Raw bytes of a document plus the name it was supplied under.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a document from disk, naming it by its path.
    pub fn from_path(path: &Path) -> IngestResult<Self> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        Ok(Self::new(path.to_string_lossy().to_string(), bytes))
    }

    /// Content hash of the bytes; identical uploads share an id.
    pub fn id(&self) -> DocumentId {
        content_hash(&self.bytes)
    }
}

/// Documents and their chunks, ready for indexing.
#[derive(Debug, Clone)]
pub struct PreparedCorpus {
    pub documents: Vec<Document>,
    pub chunks: Vec<Chunk>,
}

impl PreparedCorpus {
    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|d| d.id.clone()).collect()
    }
}

/// Loads documents into pages and splits them into chunks.
#[derive(Debug, Clone)]
pub struct Ingestor {
    chunker: Chunker,
}

impl Ingestor {
    /// Create a new ingestor.
    pub fn new(chunk_config: ChunkConfig) -> IngestResult<Self> {
        Ok(Self {
            chunker: Chunker::new(chunk_config)?,
        })
    }

    /// Create an ingestor with default chunking config.
    pub fn with_defaults() -> IngestResult<Self> {
        Self::new(ChunkConfig::default())
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Load a single raw document into pages.
    pub fn load(&self, raw: &RawDocument) -> IngestResult<Document> {
        let kind = DocumentKind::from_name(&raw.name)?;
        debug!("Loading {} as {}", raw.name, kind);

        let pages = kind.load(&raw.name, &raw.bytes)?;
        if pages.iter().all(|p| p.text.trim().is_empty()) {
            return Err(IngestError::EmptyDocument(raw.name.clone()));
        }

        let document = Document::new(raw.id(), raw.name.clone(), pages);
        info!(
            "Loaded {} ({} pages, {} characters)",
            document.name,
            document.pages.len(),
            document.char_count()
        );
        Ok(document)
    }

    /// Load a document from disk.
    pub fn load_path(&self, path: &Path) -> IngestResult<Document> {
        self.load(&RawDocument::from_path(path)?)
    }

    /// Read every supported file under `dir`, sorted by path.
    pub fn read_dir(&self, dir: &Path) -> IngestResult<Vec<RawDocument>> {
        if !dir.is_dir() {
            return Err(IngestError::FileNotFound(dir.to_path_buf()));
        }

        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file())
            .filter(|p| {
                !p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with('.'))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut raws = Vec::new();
        for path in paths {
            let name = path.to_string_lossy().to_string();
            if DocumentKind::from_name(&name).is_err() {
                debug!("Skipping unsupported file: {:?}", path);
                continue;
            }
            raws.push(RawDocument::from_path(&path)?);
        }

        if raws.is_empty() {
            warn!("No supported documents found in {:?}", dir);
        }
        Ok(raws)
    }

    /// Load and chunk a set of documents. Duplicate uploads (same bytes) are loaded once.
    /// Any document that fails to load fails the whole batch.
    pub fn prepare(&self, raws: &[RawDocument]) -> IngestResult<PreparedCorpus> {
        let mut documents: Vec<Document> = Vec::with_capacity(raws.len());

        for raw in raws {
            let id = raw.id();
            if documents.iter().any(|d| d.id == id) {
                debug!("Skipping duplicate upload: {}", raw.name);
                continue;
            }
            documents.push(self.load(raw)?);
        }

        let chunks = self.chunker.chunk_documents(&documents);
        info!(
            "Prepared {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );

        Ok(PreparedCorpus { documents, chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ingestor() -> Ingestor {
        Ingestor::new(ChunkConfig::new(40, 8)).unwrap()
    }

    #[test]
    fn test_load_text_document() {
        let raw = RawDocument::new("guide.txt", "First page text.\x0CSecond page text.");
        let doc = ingestor().load(&raw).unwrap();

        assert_eq!(doc.name, "guide.txt");
        assert_eq!(doc.id, raw.id());
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[1].number, 2);
    }

    #[test]
    fn test_empty_document_rejected() {
        let raw = RawDocument::new("blank.txt", "   \x0C\n");
        let err = ingestor().load(&raw).unwrap_err();
        assert!(matches!(err, IngestError::EmptyDocument(_)));
    }

    #[test]
    fn test_unsupported_upload_rejected() {
        let raw = RawDocument::new("schematic.dwg", vec![0u8; 4]);
        assert!(matches!(
            ingestor().load(&raw),
            Err(IngestError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_prepare_dedupes_identical_uploads() {
        let a = RawDocument::new("a.txt", "Compressor manual body text that is long enough to split.");
        let b = RawDocument::new("copy-of-a.txt", a.bytes.clone());
        let c = RawDocument::new("c.md", "# Dryer\n\nRefrigeration dryer notes.");

        let corpus = ingestor().prepare(&[a, b, c]).unwrap();

        assert_eq!(corpus.documents.len(), 2);
        assert!(corpus.chunks.len() > 2);
        assert!(corpus.chunks.iter().all(|c| c.len_chars() <= 40));
        assert_eq!(corpus.document_ids().len(), 2);
    }

    #[test]
    fn test_prepare_fails_on_any_bad_document() {
        let good = RawDocument::new("ok.txt", "fine");
        let bad = RawDocument::new("bad.txt", vec![0xffu8, 0xfe]);
        assert!(ingestor().prepare(&[good, bad]).is_err());
    }

    #[test]
    fn test_read_dir_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [("b.txt", "bee"), ("a.md", "# A"), ("image.png", "png"), (".hidden.txt", "x")] {
            let mut f = std::fs::File::create(dir.path().join(name)).unwrap();
            write!(f, "{}", body).unwrap();
        }

        let raws = ingestor().read_dir(dir.path()).unwrap();
        let names: Vec<String> = raws
            .iter()
            .map(|r| fieldguide_core::base_name(&r.name).to_string())
            .collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
    }

    #[test]
    fn test_missing_file() {
        let err = ingestor()
            .load_path(Path::new("/definitely/not/here.pdf"))
            .unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound(_)));
    }
}
