//! In-memory embedding index with similarity and diversity (MMR) search.

use crate::error::{RagError, RagResult};
use fieldguide_config::{RetrievalConfig, RetrievalMode};
use fieldguide_core::{Chunk, ChunkId};
use fieldguide_llm::{Embedder, GenerationErrorKind};
use std::collections::HashSet;
use tracing::{debug, info};

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}

/// How many results to return and how to rank them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub k: usize,
    /// Candidates considered before diversity reranking.
    pub fetch_k: usize,
    pub mode: RetrievalMode,
    /// 1.0 = pure relevance, 0.0 = pure diversity.
    pub mmr_lambda: f32,
}

impl SearchParams {
    pub fn similarity(k: usize) -> Self {
        Self {
            k,
            fetch_k: k,
            mode: RetrievalMode::Similarity,
            mmr_lambda: 1.0,
        }
    }

    pub fn diversity(k: usize, fetch_k: usize) -> Self {
        Self {
            k,
            fetch_k,
            mode: RetrievalMode::Diversity,
            mmr_lambda: 0.5,
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            k: config.k,
            fetch_k: config.fetch_k,
            mode: config.mode,
            mmr_lambda: config.mmr_lambda,
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub similarity: f32,
}

struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Chunks and their vectors, one vector per chunk id.
#[derive(Default)]
pub struct EmbeddingIndex {
    entries: Vec<Entry>,
    ids: HashSet<ChunkId>,
    dimension: Option<usize>,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Vector dimension, fixed by the first batch.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Embed and store chunks not already present. Returns how many were added.
    ///
    /// The batch is all-or-nothing: if embedding fails or a vector has the
    /// wrong dimension, the index is left as it was.
    pub async fn add(&mut self, chunks: &[Chunk], embedder: &dyn Embedder) -> RagResult<usize> {
        let mut seen = HashSet::new();
        let fresh: Vec<&Chunk> = chunks
            .iter()
            .filter(|c| !self.ids.contains(&c.id) && seen.insert(c.id.as_str()))
            .collect();

        if fresh.is_empty() {
            debug!("No new chunks to index");
            return Ok(0);
        }

        let texts: Vec<String> = fresh.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .map_err(RagError::embedding)?;

        if vectors.len() != fresh.len() {
            return Err(RagError::Embedding {
                kind: GenerationErrorKind::Unknown,
                message: format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    fresh.len()
                ),
            });
        }

        let expected = self.dimension.unwrap_or_else(|| vectors[0].len());
        if expected == 0 {
            return Err(RagError::Embedding {
                kind: GenerationErrorKind::Unknown,
                message: "embedder returned empty vectors".to_string(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(RagError::Embedding {
                kind: GenerationErrorKind::Unknown,
                message: format!(
                    "embedding dimension mismatch: expected {}, got {}",
                    expected,
                    bad.len()
                ),
            });
        }

        self.dimension = Some(expected);
        for (chunk, vector) in fresh.into_iter().zip(vectors) {
            self.ids.insert(chunk.id.clone());
            self.entries.push(Entry {
                chunk: chunk.clone(),
                vector,
            });
        }

        let added = texts.len();
        info!("Indexed {} chunks ({} total)", added, self.entries.len());
        Ok(added)
    }

    /// Search by a query vector.
    pub fn search(&self, query: &[f32], params: &SearchParams) -> RagResult<Vec<ScoredChunk>> {
        if self.entries.is_empty() || params.k == 0 {
            return Ok(Vec::new());
        }
        if let Some(dimension) = self.dimension {
            if query.len() != dimension {
                return Err(RagError::Retrieval(format!(
                    "query has dimension {}, index has {}",
                    query.len(),
                    dimension
                )));
            }
        }

        let mut ranked: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.vector)))
            .collect();
        // Stable sort keeps insertion order among equal scores
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let picked = match params.mode {
            RetrievalMode::Similarity => {
                ranked.truncate(params.k);
                ranked
            }
            RetrievalMode::Diversity => {
                ranked.truncate(params.fetch_k.max(params.k));
                self.mmr_rerank(ranked, params.k, params.mmr_lambda)
            }
        };

        debug!(
            "Search ({}) returned {} of {} chunks",
            params.mode,
            picked.len(),
            self.entries.len()
        );

        Ok(picked
            .into_iter()
            .map(|(i, similarity)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                similarity,
            })
            .collect())
    }

    /// Embed `query` and search.
    pub async fn search_text(
        &self,
        query: &str,
        embedder: &dyn Embedder,
        params: &SearchParams,
    ) -> RagResult<Vec<ScoredChunk>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let vector = embedder.embed(query).await.map_err(RagError::embedding)?;
        self.search(&vector, params)
    }

    /// Greedily pick `k` candidates maximizing
    /// `λ·sim(q, d) − (1−λ)·max sim(d, selected)`.
    fn mmr_rerank(&self, candidates: Vec<(usize, f32)>, k: usize, lambda: f32) -> Vec<(usize, f32)> {
        let k = k.min(candidates.len());
        let mut selected: Vec<(usize, f32)> = Vec::with_capacity(k);
        let mut remaining = candidates;

        while selected.len() < k && !remaining.is_empty() {
            let mut best_idx = 0;
            let mut best_score = f32::NEG_INFINITY;

            for (pos, (idx, relevance)) in remaining.iter().enumerate() {
                let redundancy = selected
                    .iter()
                    .map(|(s, _)| {
                        cosine_similarity(&self.entries[*idx].vector, &self.entries[*s].vector)
                    })
                    .fold(f32::NEG_INFINITY, f32::max);
                let redundancy = if selected.is_empty() { 0.0 } else { redundancy };

                let score = lambda * relevance - (1.0 - lambda) * redundancy;
                if score > best_score {
                    best_score = score;
                    best_idx = pos;
                }
            }

            selected.push(remaining.remove(best_idx));
        }

        selected
    }
}
