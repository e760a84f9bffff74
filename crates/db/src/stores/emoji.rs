use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use reacji_core::domain::{EmbeddingVector, EmojiCandidate, EmojiRecord};
use reacji_core::errors::StoreError;
use reacji_core::ranker::rank_candidates;
use reacji_core::store::{EmojiStore, SearchFilters};

use super::{is_unique_violation, map_sqlx_error};
use crate::DbPool;

const SELECT_COLUMNS: &str = "id, code, description, category, emotion_tone, usage_scene, \
                              priority, embedding, created_at, updated_at";

/// Catalog store over SQLite. Embeddings are stored as JSON arrays in a TEXT
/// column; similarity ranking happens in process after a SQL scan of the
/// embedded rows.
pub struct SqlEmojiStore {
    pool: DbPool,
}

impl SqlEmojiStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmojiStore for SqlEmojiStore {
    async fn insert(&self, mut record: EmojiRecord) -> Result<EmojiRecord, StoreError> {
        record.validate()?;
        let now = Utc::now();
        record.created_at = Some(now);
        record.updated_at = Some(now);

        let result = sqlx::query(
            r#"
            INSERT INTO emojis (
                code, description, category, emotion_tone, usage_scene,
                priority, embedding, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.code)
        .bind(&record.description)
        .bind(record.category.as_deref())
        .bind(record.emotion_tone.map(|tone| tone.as_str()))
        .bind(record.usage_scene.as_deref())
        .bind(record.priority)
        .bind(encode_embedding(record.embedding.as_ref())?)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                StoreError::DuplicateCode(record.code.clone())
            } else {
                map_sqlx_error(error)
            }
        })?;

        record.id = Some(result.last_insert_rowid());
        Ok(record)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<EmojiRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM emojis WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|row| record_from_row(&row)).transpose()
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<EmojiRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM emojis WHERE code = ?"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|row| record_from_row(&row)).transpose()
    }

    async fn update(&self, record: &EmojiRecord) -> Result<EmojiRecord, StoreError> {
        record.validate()?;
        let id = record.id.ok_or_else(|| StoreError::NotFound(record.code.clone()))?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE emojis SET
                code = ?, description = ?, category = ?, emotion_tone = ?,
                usage_scene = ?, priority = ?, embedding = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.code)
        .bind(&record.description)
        .bind(record.category.as_deref())
        .bind(record.emotion_tone.map(|tone| tone.as_str()))
        .bind(record.usage_scene.as_deref())
        .bind(record.priority)
        .bind(encode_embedding(record.embedding.as_ref())?)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                StoreError::DuplicateCode(record.code.clone())
            } else {
                map_sqlx_error(error)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(record.code.clone()));
        }

        let mut updated = record.clone();
        updated.updated_at = Some(now);
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM emojis WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_all(&self, limit: usize, offset: usize) -> Result<Vec<EmojiRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM emojis ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM emojis")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.get::<i64, _>("count") as u64)
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
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let now = Utc::now().to_rfc3339();

        let mut updated = 0;
        for (id, vector) in updates {
            let result = sqlx::query("UPDATE emojis SET embedding = ?, updated_at = ? WHERE id = ?")
                .bind(encode_embedding(Some(vector))?)
                .bind(&now)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            updated += result.rows_affected() as usize;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(updated)
    }

    async fn find_similar(
        &self,
        query: &EmbeddingVector,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<EmojiCandidate>, StoreError> {
        let mut sql =
            format!("SELECT {SELECT_COLUMNS} FROM emojis WHERE embedding IS NOT NULL");
        if filters.category.is_some() {
            sql.push_str(" AND category = ?");
        }
        if filters.emotion_tone.is_some() {
            sql.push_str(" AND emotion_tone = ?");
        }
        if filters.usage_scene.is_some() {
            sql.push_str(" AND usage_scene = ?");
        }

        let mut db_query = sqlx::query(&sql);
        if let Some(category) = &filters.category {
            db_query = db_query.bind(category);
        }
        if let Some(tone) = filters.emotion_tone {
            db_query = db_query.bind(tone.as_str());
        }
        if let Some(scene) = &filters.usage_scene {
            db_query = db_query.bind(scene);
        }

        let rows = db_query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;
        let records: Vec<EmojiRecord> =
            rows.iter().map(record_from_row).collect::<Result<_, _>>()?;

        Ok(rank_candidates(records, query, limit, filters))
    }
}

fn encode_embedding(embedding: Option<&EmbeddingVector>) -> Result<Option<String>, StoreError> {
    embedding
        .map(|vector| {
            serde_json::to_string(vector)
                .map_err(|error| StoreError::Operation(format!("encode embedding: {error}")))
        })
        .transpose()
}

fn record_from_row(row: &SqliteRow) -> Result<EmojiRecord, StoreError> {
    let embedding = row
        .get::<Option<String>, _>("embedding")
        .map(|raw| {
            serde_json::from_str::<EmbeddingVector>(&raw)
                .map_err(|error| StoreError::Operation(format!("decode embedding: {error}")))
        })
        .transpose()?;

    let emotion_tone = row
        .get::<Option<String>, _>("emotion_tone")
        .map(|raw| raw.parse().map_err(StoreError::Validation))
        .transpose()?;

    Ok(EmojiRecord {
        id: Some(row.get::<i64, _>("id")),
        code: row.get("code"),
        description: row.get("description"),
        category: row.get("category"),
        emotion_tone,
        usage_scene: row.get("usage_scene"),
        priority: row.get::<i64, _>("priority") as i32,
        embedding,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
    row.get::<Option<String>, _>(column)
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|error| StoreError::Operation(format!("decode {column}: {error}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use reacji_core::domain::{EmbeddingVector, EmojiRecord, EmotionTone, EMBEDDING_DIMENSION};
    use reacji_core::errors::StoreError;
    use reacji_core::store::{EmojiStore, SearchFilters};

    use super::SqlEmojiStore;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlEmojiStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        SqlEmojiStore::new(pool)
    }

    fn vector_of(value: f32) -> EmbeddingVector {
        EmbeddingVector::new(vec![value; EMBEDDING_DIMENSION]).expect("valid dimension")
    }

    fn record(code: &str, description: &str) -> EmojiRecord {
        EmojiRecord::new(code, description).expect("valid record")
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let store = store().await;

        let inserted = store
            .insert(
                record(":tada:", "celebration")
                    .with_category("emotions")
                    .with_emotion_tone(EmotionTone::Positive),
            )
            .await
            .expect("insert succeeds");

        assert!(inserted.id.is_some());
        assert!(inserted.created_at.is_some());
        assert!(inserted.updated_at.is_some());

        let found = store
            .get_by_code(":tada:")
            .await
            .expect("lookup succeeds")
            .expect("record exists");
        assert_eq!(found, inserted);
        assert_eq!(found.emotion_tone, Some(EmotionTone::Positive));
    }

    #[tokio::test]
    async fn duplicate_codes_are_rejected_distinctly() {
        let store = store().await;
        store.insert(record(":tada:", "celebration")).await.expect("first insert");

        let result = store.insert(record(":tada:", "another")).await;

        assert!(matches!(result, Err(StoreError::DuplicateCode(code)) if code == ":tada:"));
    }

    #[tokio::test]
    async fn update_persists_changes_and_bumps_updated_at() {
        let store = store().await;
        let inserted = store.insert(record(":tada:", "celebration")).await.expect("insert");

        let mut changed = inserted.clone();
        changed.description = "a party".to_owned();
        let updated = store.update(&changed).await.expect("update succeeds");

        let found = store
            .get_by_id(inserted.id.expect("has id"))
            .await
            .expect("lookup succeeds")
            .expect("record exists");
        assert_eq!(found.description, "a party");
        assert!(updated.updated_at >= inserted.updated_at);
    }

    #[tokio::test]
    async fn updating_a_missing_row_is_not_found() {
        let store = store().await;
        let mut ghost = record(":ghost:", "spooky");
        ghost.id = Some(4242);

        let result = store.update(&ghost).await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let store = store().await;
        let inserted = store.insert(record(":tada:", "celebration")).await.expect("insert");
        let id = inserted.id.expect("has id");

        assert!(store.delete(id).await.expect("delete succeeds"));
        assert!(!store.delete(id).await.expect("second delete succeeds"));
        assert!(store.get_by_id(id).await.expect("lookup succeeds").is_none());
    }

    #[tokio::test]
    async fn get_all_pages_in_id_order() {
        let store = store().await;
        for index in 0..5 {
            store
                .insert(record(&format!(":emoji{index}:"), "entry"))
                .await
                .expect("insert");
        }

        let first_page = store.get_all(2, 0).await.expect("page");
        let second_page = store.get_all(2, 2).await.expect("page");

        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].code, ":emoji0:");
        assert_eq!(second_page[0].code, ":emoji2:");
        assert_eq!(store.count().await.expect("count"), 5);
    }

    #[tokio::test]
    async fn batch_embedding_update_writes_all_rows_at_once() {
        let store = store().await;
        let first = store.insert(record(":one:", "first")).await.expect("insert");
        let second = store.insert(record(":two:", "second")).await.expect("insert");

        let mut updates = HashMap::new();
        updates.insert(first.id.expect("has id"), vector_of(0.1));
        updates.insert(second.id.expect("has id"), vector_of(0.2));
        updates.insert(987_654, vector_of(0.3));

        let written = store.batch_update_embeddings(&updates).await.expect("flush succeeds");

        assert_eq!(written, 2, "unknown ids must not count as updates");
        let found = store
            .get_by_code(":one:")
            .await
            .expect("lookup succeeds")
            .expect("record exists");
        assert_eq!(found.embedding, Some(vector_of(0.1)));
    }

    #[tokio::test]
    async fn find_similar_skips_unembedded_rows_and_applies_filters() {
        let store = store().await;
        store
            .insert(
                record(":joy:", "pure joy")
                    .with_emotion_tone(EmotionTone::Positive)
                    .with_embedding(vector_of(0.4)),
            )
            .await
            .expect("insert");
        store
            .insert(
                record(":rage:", "fury")
                    .with_emotion_tone(EmotionTone::Negative)
                    .with_embedding(vector_of(0.4)),
            )
            .await
            .expect("insert");
        store.insert(record(":bare:", "no vector")).await.expect("insert");

        let all = store
            .find_similar(&vector_of(0.4), 10, &SearchFilters::default())
            .await
            .expect("search succeeds");
        assert_eq!(all.len(), 2, "rows without embeddings are never candidates");

        let filters = SearchFilters {
            emotion_tone: Some(EmotionTone::Positive),
            ..SearchFilters::default()
        };
        let positive = store
            .find_similar(&vector_of(0.4), 10, &filters)
            .await
            .expect("search succeeds");
        assert_eq!(positive.len(), 1);
        assert_eq!(positive[0].record.code, ":joy:");
        assert!((positive[0].similarity_score - 1.0).abs() < 1e-5);
    }
}
