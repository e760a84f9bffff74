//! Batch vectorization of the emoji catalog.
//!
//! All variants embed the record description and persist vectors through
//! `batch_update_embeddings`. The full-catalog run accumulates every vector
//! and flushes once; the chunked run flushes per chunk to bound memory. There
//! is no cancellation token; a run completes or aborts on error.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::catalog_cache::EmojiCatalogCache;
use crate::domain::{EmbeddingVector, EmojiRecord, EmotionTone};
use crate::embedding_cache::EmbeddingCache;
use crate::errors::{PipelineError, ProviderError};
use crate::store::{EmojiStore, SearchFilters};

pub const DEFAULT_BATCH_SIZE: usize = 10;

const SCAN_PAGE_SIZE: usize = 1000;
const DESCRIPTION_PREVIEW_LENGTH: usize = 40;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorizeOptions {
    /// Leave rows that already carry an embedding untouched. Off by
    /// default: a plain run re-embeds the whole catalog.
    pub skip_existing: bool,
    pub category: Option<String>,
    pub emotion_tone: Option<EmotionTone>,
    /// Report what would be processed without calling the provider or
    /// writing anything.
    pub dry_run: bool,
}

impl Default for VectorizeOptions {
    fn default() -> Self {
        Self { skip_existing: false, category: None, emotion_tone: None, dry_run: false }
    }
}

impl VectorizeOptions {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            emotion_tone: self.emotion_tone,
            category: self.category.clone(),
            usage_scene: None,
        }
    }
}

/// Counts always satisfy `processed + failures + skipped + filtered_out ==
/// total`, where failures are logged rows that neither processed nor
/// persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VectorizeReport {
    pub processed: usize,
    pub skipped: usize,
    pub filtered_out: usize,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VectorizeOutcome {
    Completed(VectorizeReport),
    DryRun { would_process: usize, skipped: usize, filtered_out: usize, total: usize },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchVectorizeReport {
    pub successful: usize,
    pub failed: usize,
}

/// Outcome of a single-record vectorization. Nothing is persisted either
/// way; the caller decides what to do with the vector.
#[derive(Clone, Debug, PartialEq)]
pub enum SingleVectorizeResult {
    Embedded { code: String, vector: EmbeddingVector },
    Failed { code: String, error: ProviderError },
}

pub struct BatchEmbeddingPipeline {
    store: Arc<dyn EmojiStore>,
    embedder: Arc<EmbeddingCache>,
    catalog_cache: Option<Arc<EmojiCatalogCache>>,
}

impl BatchEmbeddingPipeline {
    pub fn new(store: Arc<dyn EmojiStore>, embedder: Arc<EmbeddingCache>) -> Self {
        Self { store, embedder, catalog_cache: None }
    }

    /// Invalidates cached catalog entries after embedding writes land.
    pub fn with_catalog_cache(mut self, cache: Arc<EmojiCatalogCache>) -> Self {
        self.catalog_cache = Some(cache);
        self
    }

    /// Embeds every eligible record and flushes all vectors in one store
    /// write. `progress` is called after each row as
    /// `(current, planned, code)`.
    #[instrument(skip(self, options, progress))]
    pub async fn vectorize_all(
        &self,
        options: &VectorizeOptions,
        mut progress: impl FnMut(usize, usize, &str),
    ) -> Result<VectorizeOutcome, PipelineError> {
        let catalog = self.load_catalog().await?;
        let total = catalog.len();
        let filters = options.filters();

        let mut skipped = 0;
        let mut filtered_out = 0;
        let mut pending = Vec::new();
        for record in catalog {
            if options.skip_existing && record.embedding.is_some() {
                skipped += 1;
            } else if !filters.is_empty() && !filters.matches(&record) {
                filtered_out += 1;
            } else {
                pending.push(record);
            }
        }

        if options.dry_run {
            info!(would_process = pending.len(), skipped, filtered_out, total, "dry run");
            return Ok(VectorizeOutcome::DryRun {
                would_process: pending.len(),
                skipped,
                filtered_out,
                total,
            });
        }

        let planned = pending.len();
        let mut updates: HashMap<i64, EmbeddingVector> = HashMap::new();
        let mut codes: Vec<String> = Vec::new();
        for (index, record) in pending.iter().enumerate() {
            match self.embedder.get_or_compute(&record.description).await {
                Ok(vector) => {
                    if let Some(id) = record.id {
                        updates.insert(id, vector);
                        codes.push(record.code.clone());
                    } else {
                        warn!(code = %record.code, "record has no id, cannot persist embedding");
                    }
                }
                Err(error) => {
                    warn!(
                        code = %record.code,
                        description = %preview(&record.description),
                        error = %error,
                        "embedding failed, row left unvectorized"
                    );
                }
            }
            progress(index + 1, planned, &record.code);
        }

        let processed = updates.len();
        if !updates.is_empty() {
            self.store.batch_update_embeddings(&updates).await?;
            self.invalidate(&codes).await;
        }

        info!(processed, skipped, filtered_out, total, "vectorization completed");
        Ok(VectorizeOutcome::Completed(VectorizeReport { processed, skipped, filtered_out, total }))
    }

    /// Embeds rows that lack a vector in chunks of `batch_size`, flushing
    /// after each chunk. A chunk failure aborts the run unless
    /// `continue_on_error` is set, in which case its rows count as failed.
    pub async fn vectorize_batch(
        &self,
        batch_size: usize,
        continue_on_error: bool,
    ) -> Result<BatchVectorizeReport, PipelineError> {
        let batch_size = batch_size.max(1);
        let pending: Vec<EmojiRecord> = self
            .load_catalog()
            .await?
            .into_iter()
            .filter(|record| record.embedding.is_none())
            .collect();

        let mut report = BatchVectorizeReport::default();
        for chunk in pending.chunks(batch_size) {
            match self.flush_chunk(chunk).await {
                Ok(written) => report.successful += written,
                Err(error) => {
                    report.failed += chunk.len();
                    if !continue_on_error {
                        return Err(error);
                    }
                    warn!(chunk = chunk.len(), error = %error, "chunk failed, continuing");
                }
            }
        }
        Ok(report)
    }

    async fn flush_chunk(&self, chunk: &[EmojiRecord]) -> Result<usize, PipelineError> {
        let texts: Vec<String> = chunk.iter().map(|record| record.description.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let mut updates = HashMap::new();
        let mut codes = Vec::new();
        for (record, vector) in chunk.iter().zip(vectors) {
            if let Some(id) = record.id {
                updates.insert(id, vector);
                codes.push(record.code.clone());
            }
        }
        let written = self.store.batch_update_embeddings(&updates).await?;
        self.invalidate(&codes).await;
        Ok(written)
    }

    /// Embeds one record, optionally with a model override, without
    /// persisting. `skip_on_error` turns provider failures into a
    /// [`SingleVectorizeResult::Failed`] instead of an error.
    pub async fn vectorize_one(
        &self,
        record: &EmojiRecord,
        model: Option<&str>,
        skip_on_error: bool,
    ) -> Result<SingleVectorizeResult, PipelineError> {
        let result = match model {
            Some(model) => self.embedder.embed_with_model(&record.description, model).await,
            None => self.embedder.get_or_compute(&record.description).await,
        };
        match result {
            Ok(vector) => {
                Ok(SingleVectorizeResult::Embedded { code: record.code.clone(), vector })
            }
            Err(error) if skip_on_error => {
                warn!(code = %record.code, error = %error, "single vectorization failed");
                Ok(SingleVectorizeResult::Failed { code: record.code.clone(), error })
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn load_catalog(&self) -> Result<Vec<EmojiRecord>, PipelineError> {
        let mut catalog = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.store.get_all(SCAN_PAGE_SIZE, offset).await?;
            let page_len = page.len();
            catalog.extend(page);
            if page_len < SCAN_PAGE_SIZE {
                break;
            }
            offset += page_len;
        }
        Ok(catalog)
    }

    async fn invalidate(&self, codes: &[String]) {
        if let Some(cache) = &self.catalog_cache {
            for code in codes {
                cache.invalidate(code).await;
            }
        }
    }
}

fn preview(description: &str) -> &str {
    let mut end = description.len().min(DESCRIPTION_PREVIEW_LENGTH);
    while !description.is_char_boundary(end) {
        end -= 1;
    }
    &description[..end]
}
