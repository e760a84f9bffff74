//! Shared in-memory doubles for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    AdminUser, EmbeddingVector, EmojiCandidate, EmojiRecord, EMBEDDING_DIMENSION,
};
use crate::errors::{ProviderError, StoreError};
use crate::provider::EmbeddingProvider;
use crate::ranker::rank_candidates;
use crate::store::{AdminStore, EmojiStore, SearchFilters};

pub(crate) fn vector_of(value: f32) -> EmbeddingVector {
    EmbeddingVector::new(vec![value; EMBEDDING_DIMENSION]).expect("dimension is valid")
}

/// Catalog double backed by a plain `Vec`, with call counters for asserting
/// cache behavior.
pub(crate) struct StubEmojiStore {
    rows: tokio::sync::RwLock<Vec<EmojiRecord>>,
    next_id: AtomicUsize,
    get_by_code_calls: AtomicUsize,
    find_similar_calls: AtomicUsize,
    batch_update_calls: AtomicUsize,
}

impl StubEmojiStore {
    pub(crate) fn with_rows(mut rows: Vec<EmojiRecord>) -> Self {
        let mut next_id = 1;
        for row in &mut rows {
            if row.id.is_none() {
                row.id = Some(next_id);
            }
            next_id = row.id.unwrap_or(next_id) + 1;
        }
        Self {
            rows: tokio::sync::RwLock::new(rows),
            next_id: AtomicUsize::new(next_id as usize),
            get_by_code_calls: AtomicUsize::new(0),
            find_similar_calls: AtomicUsize::new(0),
            batch_update_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) async fn replace_rows(&self, rows: Vec<EmojiRecord>) {
        *self.rows.write().await = rows;
    }

    pub(crate) async fn rows(&self) -> Vec<EmojiRecord> {
        self.rows.read().await.clone()
    }

    pub(crate) fn get_by_code_calls(&self) -> usize {
        self.get_by_code_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn find_similar_calls(&self) -> usize {
        self.find_similar_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn batch_update_calls(&self) -> usize {
        self.batch_update_calls.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) as i64
    }
}

#[async_trait]
impl EmojiStore for StubEmojiStore {
    async fn insert(&self, mut record: EmojiRecord) -> Result<EmojiRecord, StoreError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.code == record.code) {
            return Err(StoreError::DuplicateCode(record.code));
        }
        record.id = Some(self.allocate_id());
        rows.push(record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<EmojiRecord>, StoreError> {
        Ok(self.rows.read().await.iter().find(|row| row.id == Some(id)).cloned())
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<EmojiRecord>, StoreError> {
        self.get_by_code_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.read().await.iter().find(|row| row.code == code).cloned())
    }

    async fn update(&self, record: &EmojiRecord) -> Result<EmojiRecord, StoreError> {
        let mut rows = self.rows.write().await;
        let slot = rows
            .iter_mut()
            .find(|row| row.id == record.id)
            .ok_or_else(|| StoreError::NotFound(record.code.clone()))?;
        *slot = record.clone();
        Ok(record.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id != Some(id));
        Ok(rows.len() < before)
    }

    async fn get_all(&self, limit: usize, offset: usize) -> Result<Vec<EmojiRecord>, StoreError> {
        Ok(self.rows.read().await.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.rows.read().await.len() as u64)
    }

    async fn batch_insert(
        &self,
        records: Vec<EmojiRecord>,
    ) -> Result<Vec<EmojiRecord>, StoreError> {
        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            inserted.push(self.insert(record).await?);
        }
        Ok(inserted)
    }

    async fn batch_update_embeddings(
        &self,
        updates: &HashMap<i64, EmbeddingVector>,
    ) -> Result<usize, StoreError> {
        self.batch_update_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.write().await;
        let mut updated = 0;
        for row in rows.iter_mut() {
            if let Some(vector) = row.id.and_then(|id| updates.get(&id)) {
                row.embedding = Some(vector.clone());
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn find_similar(
        &self,
        query: &EmbeddingVector,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<EmojiCandidate>, StoreError> {
        self.find_similar_calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read().await.clone();
        Ok(rank_candidates(rows, query, limit, filters))
    }
}

/// Catalog double that fails every operation with a fixed error.
pub(crate) struct FailingEmojiStore {
    error: StoreError,
    calls: AtomicUsize,
}

impl FailingEmojiStore {
    pub(crate) fn new(error: StoreError) -> Self {
        Self { error, calls: AtomicUsize::new(0) }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

#[async_trait]
impl EmojiStore for FailingEmojiStore {
    async fn insert(&self, _record: EmojiRecord) -> Result<EmojiRecord, StoreError> {
        self.fail()
    }

    async fn get_by_id(&self, _id: i64) -> Result<Option<EmojiRecord>, StoreError> {
        self.fail()
    }

    async fn get_by_code(&self, _code: &str) -> Result<Option<EmojiRecord>, StoreError> {
        self.fail()
    }

    async fn update(&self, _record: &EmojiRecord) -> Result<EmojiRecord, StoreError> {
        self.fail()
    }

    async fn delete(&self, _id: i64) -> Result<bool, StoreError> {
        self.fail()
    }

    async fn get_all(&self, _limit: usize, _offset: usize) -> Result<Vec<EmojiRecord>, StoreError> {
        self.fail()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.fail()
    }

    async fn batch_insert(
        &self,
        _records: Vec<EmojiRecord>,
    ) -> Result<Vec<EmojiRecord>, StoreError> {
        self.fail()
    }

    async fn batch_update_embeddings(
        &self,
        _updates: &HashMap<i64, EmbeddingVector>,
    ) -> Result<usize, StoreError> {
        self.fail()
    }

    async fn find_similar(
        &self,
        _query: &EmbeddingVector,
        _limit: usize,
        _filters: &SearchFilters,
    ) -> Result<Vec<EmojiCandidate>, StoreError> {
        self.fail()
    }
}

/// Provider double that derives a vector from the text length and can be
/// scripted to fail for specific texts.
pub(crate) struct ScriptedProvider {
    fail_on: HashSet<String>,
    embed_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_on: HashSet::new(),
            embed_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing_on(texts: impl IntoIterator<Item = &'static str>) -> Arc<Self> {
        Arc::new(Self {
            fail_on: texts.into_iter().map(str::to_owned).collect(),
            embed_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Result<EmbeddingVector, ProviderError> {
        if self.fail_on.contains(text) {
            return Err(ProviderError::Api(format!("scripted failure for `{text}`")));
        }
        Ok(vector_of(text.len() as f32))
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ProviderError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.vector_for(text)
    }

    async fn embed_with_model(
        &self,
        text: &str,
        _model: &str,
    ) -> Result<EmbeddingVector, ProviderError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.vector_for(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|text| self.vector_for(text)).collect()
    }

    fn model_name(&self) -> &str {
        "scripted-test-model"
    }
}

/// Permission store double over a `HashMap`.
pub(crate) struct StubAdminStore {
    users: tokio::sync::RwLock<HashMap<String, AdminUser>>,
}

impl StubAdminStore {
    pub(crate) fn with_users(users: Vec<AdminUser>) -> Self {
        let map = users.into_iter().map(|user| (user.user_id.clone(), user)).collect();
        Self { users: tokio::sync::RwLock::new(map) }
    }
}

#[async_trait]
impl AdminStore for StubAdminStore {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Option<AdminUser>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn upsert(&self, user: AdminUser) -> Result<AdminUser, StoreError> {
        self.users.write().await.insert(user.user_id.clone(), user.clone());
        Ok(user)
    }

    async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(user_id).is_some())
    }

    async fn list(&self) -> Result<Vec<AdminUser>, StoreError> {
        let mut users: Vec<AdminUser> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(users)
    }
}
