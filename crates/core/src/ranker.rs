//! Similarity ranking over the emoji catalog.
//!
//! The ranking contract lives here: cosine similarity between the query and
//! each stored embedding, scores clamped into [0, 1] with NaN mapped to 0.0,
//! filters applied conjunctively, results ordered by score descending and
//! truncated to the requested limit. Store implementations reuse
//! [`rank_candidates`] so every backend ranks identically.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::domain::{EmbeddingVector, EmojiCandidate, EmojiRecord};
use crate::embedding_cache::EmbeddingCache;
use crate::errors::{SearchError, ValidationError};
use crate::resilience::CircuitBreaker;
use crate::store::{EmojiStore, SearchFilters};

pub const DEFAULT_SEARCH_LIMIT: usize = 3;
pub const DEFAULT_BREAKER_THRESHOLD: u32 = 5;
pub const DEFAULT_BREAKER_TIMEOUT: Duration = Duration::from_secs(60);

/// Maps NaN to 0.0 and clamps into [0, 1].
pub fn clamp_score(raw: f32) -> f32 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 1.0)
    }
}

/// Ranks `records` against `query`. Rows without an embedding are skipped,
/// then filters, then cosine scoring. Ties keep an implementation-defined
/// order (the sort is stable over input order).
pub fn rank_candidates(
    records: impl IntoIterator<Item = EmojiRecord>,
    query: &EmbeddingVector,
    limit: usize,
    filters: &SearchFilters,
) -> Vec<EmojiCandidate> {
    let mut candidates: Vec<EmojiCandidate> = records
        .into_iter()
        .filter(|record| record.embedding.is_some() && filters.matches(record))
        .map(|record| {
            let score = record
                .embedding
                .as_ref()
                .map(|embedding| clamp_score(query.cosine_similarity(embedding)))
                .unwrap_or(0.0);
            EmojiCandidate { record, similarity_score: score }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(limit);
    candidates
}

/// Front door for similarity searches. Store access runs through a circuit
/// breaker so a dead database degrades to fast failures instead of piling up
/// timed-out queries.
pub struct SimilarityRanker {
    store: Arc<dyn EmojiStore>,
    breaker: CircuitBreaker,
    embedder: Option<Arc<EmbeddingCache>>,
}

impl SimilarityRanker {
    pub fn new(store: Arc<dyn EmojiStore>) -> Self {
        Self::with_breaker(
            store,
            CircuitBreaker::new(DEFAULT_BREAKER_THRESHOLD, DEFAULT_BREAKER_TIMEOUT),
        )
    }

    pub fn with_breaker(store: Arc<dyn EmojiStore>, breaker: CircuitBreaker) -> Self {
        Self { store, breaker, embedder: None }
    }

    /// Enables [`find_similar_by_text`](Self::find_similar_by_text).
    pub fn with_embedder(mut self, embedder: Arc<EmbeddingCache>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.breaker.is_open()
    }

    /// Searches with a pre-computed query vector. The dimension is validated
    /// before anything touches the store.
    #[instrument(skip(self, query), fields(limit))]
    pub async fn find_similar(
        &self,
        query: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<EmojiCandidate>, SearchError> {
        let query = EmbeddingVector::new(query.to_vec())?;
        let candidates = self
            .breaker
            .call(|| self.store.find_similar(&query, limit, filters))
            .await?;
        debug!(candidates = candidates.len(), "similarity search completed");
        Ok(finalize(candidates, limit))
    }

    /// Embeds `text` (through the shared embedding cache) and searches with
    /// the resulting vector.
    pub async fn find_similar_by_text(
        &self,
        text: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<EmojiCandidate>, SearchError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptySearchText.into());
        }
        let embedder = self.embedder.as_ref().ok_or(SearchError::ProviderNotConfigured)?;
        let query = embedder.get_or_compute(text).await?;

        let candidates = self
            .breaker
            .call(|| self.store.find_similar(&query, limit, filters))
            .await?;
        Ok(finalize(candidates, limit))
    }
}

/// Backends are expected to clamp, sort, and truncate already; this
/// re-applies all three so the contract holds regardless of backend.
fn finalize(mut candidates: Vec<EmojiCandidate>, limit: usize) -> Vec<EmojiCandidate> {
    for candidate in &mut candidates {
        candidate.similarity_score = clamp_score(candidate.similarity_score);
    }
    candidates.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(limit);
    candidates
}
