//! Collaborator contracts for the catalog and permission stores.
//!
//! Implementations live in `reacji-db`; the algorithmic core only ever sees
//! these traits.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{AdminUser, EmbeddingVector, EmojiCandidate, EmojiRecord, EmotionTone};
use crate::errors::StoreError;

/// Equality filters for a similarity query. All present fields must match
/// (AND semantics).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub emotion_tone: Option<EmotionTone>,
    pub category: Option<String>,
    pub usage_scene: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.emotion_tone.is_none() && self.category.is_none() && self.usage_scene.is_none()
    }

    pub fn matches(&self, record: &EmojiRecord) -> bool {
        if let Some(tone) = self.emotion_tone {
            if record.emotion_tone != Some(tone) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if record.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(scene) = &self.usage_scene {
            if record.usage_scene.as_deref() != Some(scene.as_str()) {
                return false;
            }
        }
        true
    }

    /// Builds filters from loose `key:value` pairs (slash commands, CLI).
    /// Keys other than `emotion_tone`/`tone`, `category`, and
    /// `usage_scene`/`scene` are ignored, not errors.
    pub fn from_key_values<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, crate::errors::ValidationError> {
        let mut filters = Self::default();
        for (key, value) in pairs {
            match key {
                "emotion_tone" | "tone" => filters.emotion_tone = Some(value.parse()?),
                "category" => filters.category = Some(value.to_owned()),
                "usage_scene" | "scene" => filters.usage_scene = Some(value.to_owned()),
                _ => {}
            }
        }
        Ok(filters)
    }
}

/// The vector-indexed emoji catalog.
///
/// `find_similar` carries the ranking contract: cosine similarity over rows
/// with a non-null embedding, `similarity = 1 - distance` clamped into
/// [0, 1] with NaN mapped to 0.0, filters ANDed, ordered by similarity
/// descending, truncated to `limit`.
#[async_trait]
pub trait EmojiStore: Send + Sync {
    async fn insert(&self, record: EmojiRecord) -> Result<EmojiRecord, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<EmojiRecord>, StoreError>;

    async fn get_by_code(&self, code: &str) -> Result<Option<EmojiRecord>, StoreError>;

    async fn update(&self, record: &EmojiRecord) -> Result<EmojiRecord, StoreError>;

    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    async fn get_all(&self, limit: usize, offset: usize) -> Result<Vec<EmojiRecord>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn batch_insert(&self, records: Vec<EmojiRecord>) -> Result<Vec<EmojiRecord>, StoreError>;

    /// Writes the given `id -> vector` map in one operation, bumping
    /// `updated_at` on each touched row. Returns the number of rows updated.
    async fn batch_update_embeddings(
        &self,
        updates: &HashMap<i64, EmbeddingVector>,
    ) -> Result<usize, StoreError>;

    async fn find_similar(
        &self,
        query: &EmbeddingVector,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<EmojiCandidate>, StoreError>;
}

/// Permission rows for the slash-command surface.
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Option<AdminUser>, StoreError>;

    async fn upsert(&self, user: AdminUser) -> Result<AdminUser, StoreError>;

    async fn delete(&self, user_id: &str) -> Result<bool, StoreError>;

    async fn list(&self) -> Result<Vec<AdminUser>, StoreError>;
}
