//! In-process read-through cache over `get_by_code` lookups.
//!
//! Correctness is bound to explicit invalidation, not TTLs: every successful
//! update or delete must invalidate the entry for that code. "Not found" is
//! never cached, so lookups of a nonexistent code keep querying the store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::EmojiRecord;
use crate::errors::StoreError;
use crate::store::EmojiStore;

/// Page size for the warm-up scan.
pub const LOAD_PAGE_SIZE: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogCacheStats {
    pub entries: usize,
}

pub struct EmojiCatalogCache {
    store: Arc<dyn EmojiStore>,
    entries: RwLock<HashMap<String, EmojiRecord>>,
}

impl EmojiCatalogCache {
    pub fn new(store: Arc<dyn EmojiStore>) -> Self {
        Self { store, entries: RwLock::new(HashMap::new()) }
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<EmojiRecord>, StoreError> {
        {
            let entries = self.entries.read().await;
            if let Some(record) = entries.get(code) {
                debug!(code, "catalog cache hit");
                return Ok(Some(record.clone()));
            }
        }

        let record = self.store.get_by_code(code).await?;
        if let Some(record) = &record {
            let mut entries = self.entries.write().await;
            entries.insert(record.code.clone(), record.clone());
        }
        Ok(record)
    }

    /// Must be called after every acknowledged update or delete of `code`.
    pub async fn invalidate(&self, code: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(code).is_some() {
            debug!(code, "catalog cache entry invalidated");
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Eagerly populates the cache from a full catalog scan. Returns the
    /// number of entries loaded.
    pub async fn load_all(&self) -> Result<usize, StoreError> {
        let mut loaded = HashMap::new();
        let mut offset = 0;
        loop {
            let page = self.store.get_all(LOAD_PAGE_SIZE, offset).await?;
            let page_len = page.len();
            for record in page {
                loaded.insert(record.code.clone(), record);
            }
            if page_len < LOAD_PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        let count = loaded.len();
        *self.entries.write().await = loaded;
        info!(count, "catalog cache warmed");
        Ok(count)
    }

    pub async fn stats(&self) -> CatalogCacheStats {
        CatalogCacheStats { entries: self.entries.read().await.len() }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::EmojiCatalogCache;
    use crate::domain::EmojiRecord;
    use crate::test_support::StubEmojiStore;

    fn record(code: &str, description: &str) -> EmojiRecord {
        EmojiRecord::new(code, description).expect("valid record")
    }

    #[tokio::test]
    async fn read_through_populates_on_miss_and_serves_from_cache() {
        let store = Arc::new(StubEmojiStore::with_rows(vec![record(":smile:", "happy")]));
        let cache = EmojiCatalogCache::new(store.clone());

        let first = cache.get_by_code(":smile:").await.expect("lookup succeeds");
        assert!(first.is_some());
        assert_eq!(store.get_by_code_calls(), 1);

        let second = cache.get_by_code(":smile:").await.expect("lookup succeeds");
        assert!(second.is_some());
        assert_eq!(store.get_by_code_calls(), 1, "second lookup must be a cache hit");
    }

    #[tokio::test]
    async fn not_found_is_never_cached() {
        let store = Arc::new(StubEmojiStore::with_rows(vec![]));
        let cache = EmojiCatalogCache::new(store.clone());

        assert!(cache.get_by_code(":ghost:").await.expect("lookup succeeds").is_none());
        assert!(cache.get_by_code(":ghost:").await.expect("lookup succeeds").is_none());

        assert_eq!(store.get_by_code_calls(), 2, "missing codes must keep querying the store");
    }

    #[tokio::test]
    async fn invalidation_forces_a_store_requery() {
        let store = Arc::new(StubEmojiStore::with_rows(vec![record(":smile:", "happy")]));
        let cache = EmojiCatalogCache::new(store.clone());

        cache.get_by_code(":smile:").await.expect("lookup succeeds");
        assert_eq!(store.get_by_code_calls(), 1);

        // Simulate a write landing in the store, then the mandatory
        // invalidation that follows it.
        store.replace_rows(vec![record(":smile:", "updated description")]).await;
        cache.invalidate(":smile:").await;

        let refreshed = cache
            .get_by_code(":smile:")
            .await
            .expect("lookup succeeds")
            .expect("record exists");
        assert_eq!(store.get_by_code_calls(), 2);
        assert_eq!(refreshed.description, "updated description");
    }

    #[tokio::test]
    async fn load_all_warms_the_cache_and_reports_the_count() {
        let store = Arc::new(StubEmojiStore::with_rows(vec![
            record(":smile:", "happy"),
            record(":frown:", "sad"),
            record(":tada:", "celebration"),
        ]));
        let cache = EmojiCatalogCache::new(store.clone());

        let loaded = cache.load_all().await.expect("warm-up succeeds");
        assert_eq!(loaded, 3);
        assert_eq!(cache.stats().await.entries, 3);

        cache.get_by_code(":tada:").await.expect("lookup succeeds");
        assert_eq!(store.get_by_code_calls(), 0, "warmed entries must not hit the store");
    }
}
