//! Bounded LRU cache in front of the embedding provider.
//!
//! Two texts that normalize to the same string share one entry. Caching is
//! off unless a capacity is configured; either way this type is the front
//! door for all embedding calls, so the retry policy is applied in exactly
//! one place. Concurrent misses for the same key may each call the provider;
//! there is no single-flight de-duplication.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::domain::EmbeddingVector;
use crate::errors::ProviderError;
use crate::provider::EmbeddingProvider;
use crate::resilience::RetryPolicy;

pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Collapses whitespace runs to single spaces and trims the ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct LruEntries {
    capacity: usize,
    map: HashMap<String, EmbeddingVector>,
    // Recency order, least recent first. Capacities are small (default 100),
    // so a linear scan on touch is fine.
    recency: Vec<String>,
}

impl LruEntries {
    fn new(capacity: usize) -> Self {
        Self { capacity, map: HashMap::new(), recency: Vec::new() }
    }

    fn get(&mut self, key: &str) -> Option<EmbeddingVector> {
        let vector = self.map.get(key)?.clone();
        self.touch(key);
        Some(vector)
    }

    fn insert(&mut self, key: String, vector: EmbeddingVector) {
        self.map.insert(key.clone(), vector);
        self.touch(&key);
        if self.map.len() > self.capacity {
            let oldest = self.recency.remove(0);
            self.map.remove(&oldest);
            debug!(evicted = %oldest, "embedding cache evicted least-recently-used entry");
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(position) = self.recency.iter().position(|entry| entry == key) {
            self.recency.remove(position);
        }
        self.recency.push(key.to_owned());
    }
}

pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
    entries: Option<Mutex<LruEntries>>,
}

impl EmbeddingCache {
    /// Pass-through wrapper with caching disabled.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry, entries: None }
    }

    /// Caching enabled, bounded at `capacity` entries with LRU eviction.
    pub fn with_capacity(
        provider: Arc<dyn EmbeddingProvider>,
        retry: RetryPolicy,
        capacity: usize,
    ) -> Self {
        Self { provider, retry, entries: Some(Mutex::new(LruEntries::new(capacity.max(1)))) }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .map(|entries| lock(entries).map.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Cache hit returns a copy and refreshes recency; miss calls the
    /// provider through the retry policy and stores the result.
    pub async fn get_or_compute(&self, text: &str) -> Result<EmbeddingVector, ProviderError> {
        let normalized = normalize_text(text);

        if let Some(entries) = &self.entries {
            if let Some(vector) = lock(entries).get(&normalized) {
                debug!("embedding cache hit");
                return Ok(vector);
            }
        }

        let vector = self.retry.run(|| self.provider.embed(&normalized)).await?;

        if let Some(entries) = &self.entries {
            lock(entries).insert(normalized, vector.clone());
        }
        Ok(vector)
    }

    /// Model overrides bypass the cache: entries are keyed by text only, and
    /// mixing models under one key would return wrong vectors.
    pub async fn embed_with_model(
        &self,
        text: &str,
        model: &str,
    ) -> Result<EmbeddingVector, ProviderError> {
        let normalized = normalize_text(text);
        Ok(self.retry.run(|| self.provider.embed_with_model(&normalized, model)).await?)
    }

    /// Batch calls also bypass the cache; the pipeline flushes whole chunks
    /// and never re-reads them.
    pub async fn embed_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingVector>, ProviderError> {
        let normalized: Vec<String> = texts.iter().map(|text| normalize_text(text)).collect();
        Ok(self.retry.run(|| self.provider.embed_batch(&normalized)).await?)
    }
}

fn lock(entries: &Mutex<LruEntries>) -> std::sync::MutexGuard<'_, LruEntries> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
