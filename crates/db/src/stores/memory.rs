//! In-memory stores for tests and offline wiring.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use reacji_core::domain::{AdminUser, EmbeddingVector, EmojiCandidate, EmojiRecord};
use reacji_core::errors::StoreError;
use reacji_core::ranker::rank_candidates;
use reacji_core::store::{AdminStore, EmojiStore, SearchFilters};

#[derive(Default)]
pub struct InMemoryEmojiStore {
    rows: RwLock<HashMap<i64, EmojiRecord>>,
    next_id: AtomicI64,
}

impl InMemoryEmojiStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl EmojiStore for InMemoryEmojiStore {
    async fn insert(&self, mut record: EmojiRecord) -> Result<EmojiRecord, StoreError> {
        record.validate()?;
        let mut rows = self.rows.write().await;
        if rows.values().any(|existing| existing.code == record.code) {
            return Err(StoreError::DuplicateCode(record.code));
        }

        let id = self.allocate_id();
        let now = Utc::now();
        record.id = Some(id);
        record.created_at = Some(now);
        record.updated_at = Some(now);
        rows.insert(id, record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<EmojiRecord>, StoreError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<EmojiRecord>, StoreError> {
        Ok(self.rows.read().await.values().find(|row| row.code == code).cloned())
    }

    async fn update(&self, record: &EmojiRecord) -> Result<EmojiRecord, StoreError> {
        record.validate()?;
        let id = record.id.ok_or_else(|| StoreError::NotFound(record.code.clone()))?;
        let mut rows = self.rows.write().await;

        let collision = rows
            .iter()
            .any(|(other_id, other)| *other_id != id && other.code == record.code);
        if collision {
            return Err(StoreError::DuplicateCode(record.code.clone()));
        }

        let slot = rows.get_mut(&id).ok_or_else(|| StoreError::NotFound(record.code.clone()))?;
        let mut updated = record.clone();
        updated.created_at = slot.created_at;
        updated.updated_at = Some(Utc::now());
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn get_all(&self, limit: usize, offset: usize) -> Result<Vec<EmojiRecord>, StoreError> {
        let rows = self.rows.read().await;
        let mut all: Vec<EmojiRecord> = rows.values().cloned().collect();
        all.sort_by_key(|row| row.id);
        Ok(all.into_iter().skip(offset).take(limit).collect())
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
        let mut rows = self.rows.write().await;
        let now = Utc::now();

        let mut updated = 0;
        for (id, vector) in updates {
            if let Some(row) = rows.get_mut(id) {
                row.embedding = Some(vector.clone());
                row.updated_at = Some(now);
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
        let rows: Vec<EmojiRecord> = self.rows.read().await.values().cloned().collect();
        Ok(rank_candidates(rows, query, limit, filters))
    }
}

#[derive(Default)]
pub struct InMemoryAdminStore {
    users: RwLock<HashMap<String, AdminUser>>,
}

impl InMemoryAdminStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdminStore for InMemoryAdminStore {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Option<AdminUser>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn upsert(&self, mut user: AdminUser) -> Result<AdminUser, StoreError> {
        let mut users = self.users.write().await;
        let now = Utc::now();
        user.created_at = users
            .get(&user.user_id)
            .and_then(|existing| existing.created_at)
            .or(Some(now));
        user.updated_at = Some(now);
        users.insert(user.user_id.clone(), user.clone());
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

#[cfg(test)]
mod tests {
    use reacji_core::domain::{EmbeddingVector, EmojiRecord, EMBEDDING_DIMENSION};
    use reacji_core::errors::StoreError;
    use reacji_core::store::{EmojiStore, SearchFilters};

    use super::InMemoryEmojiStore;

    fn record(code: &str) -> EmojiRecord {
        EmojiRecord::new(code, "an entry").expect("valid record")
    }

    #[tokio::test]
    async fn insert_and_lookup_round_trip() {
        let store = InMemoryEmojiStore::new();

        let inserted = store.insert(record(":tada:")).await.expect("insert");
        assert_eq!(inserted.id, Some(1));
        assert!(inserted.created_at.is_some());

        let found = store.get_by_code(":tada:").await.expect("lookup");
        assert_eq!(found, Some(inserted));
    }

    #[tokio::test]
    async fn duplicate_codes_are_rejected() {
        let store = InMemoryEmojiStore::new();
        store.insert(record(":tada:")).await.expect("insert");

        let result = store.insert(record(":tada:")).await;
        assert!(matches!(result, Err(StoreError::DuplicateCode(_))));
    }

    #[tokio::test]
    async fn find_similar_matches_the_ranking_contract() {
        let store = InMemoryEmojiStore::new();
        let vector = EmbeddingVector::new(vec![0.2; EMBEDDING_DIMENSION]).expect("valid");
        store
            .insert(record(":embedded:").with_embedding(vector.clone()))
            .await
            .expect("insert");
        store.insert(record(":bare:")).await.expect("insert");

        let candidates = store
            .find_similar(&vector, 5, &SearchFilters::default())
            .await
            .expect("search");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].record.code, ":embedded:");
    }
}
