//! JSON import and export of the emoji catalog.
//!
//! The file format is a JSON array of entries with required `code` and
//! `description` and optional `category`, `emotion_tone`, `usage_scene`,
//! `priority`, and `embedding`. Failure modes stay distinguishable so the
//! CLI can tell a missing file from a malformed one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::emoji::DEFAULT_PRIORITY;
use crate::domain::{EmbeddingVector, EmojiRecord, EmotionTone};

#[derive(Debug, Error)]
pub enum CatalogFileError {
    #[error("catalog file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("catalog file must contain a JSON array of entries")]
    NotAnArray,
    #[error("invalid entry at index {index}: {message}")]
    InvalidEntry { index: usize, message: String },
    #[error("failed to read catalog file")]
    Read(#[source] std::io::Error),
    #[error("failed to write catalog file")]
    Write(#[source] std::io::Error),
}

/// On-disk entry shape. Identifiers and timestamps are deliberately absent;
/// they belong to a store, not a file.
#[derive(Debug, Deserialize, Serialize)]
struct CatalogEntry {
    code: String,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    emotion_tone: Option<EmotionTone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    usage_scene: Option<String>,
    #[serde(default = "default_priority")]
    priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<EmbeddingVector>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl CatalogEntry {
    fn into_record(self) -> Result<EmojiRecord, crate::errors::ValidationError> {
        let mut record = EmojiRecord::new(&self.code, &self.description)?
            .with_priority(self.priority)?;
        if let Some(category) = self.category {
            record = record.with_category(category);
        }
        if let Some(tone) = self.emotion_tone {
            record = record.with_emotion_tone(tone);
        }
        if let Some(scene) = self.usage_scene {
            record = record.with_usage_scene(scene);
        }
        if let Some(embedding) = self.embedding {
            record = record.with_embedding(embedding);
        }
        Ok(record)
    }

    fn from_record(record: &EmojiRecord) -> Self {
        Self {
            code: record.code.clone(),
            description: record.description.clone(),
            category: record.category.clone(),
            emotion_tone: record.emotion_tone,
            usage_scene: record.usage_scene.clone(),
            priority: record.priority,
            embedding: record.embedding.clone(),
        }
    }
}

pub fn load_catalog_file(path: &Path) -> Result<Vec<EmojiRecord>, CatalogFileError> {
    let raw = std::fs::read_to_string(path).map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            CatalogFileError::NotFound(path.to_path_buf())
        } else {
            CatalogFileError::Read(error)
        }
    })?;

    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|error| CatalogFileError::InvalidJson(error.to_string()))?;
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        _ => return Err(CatalogFileError::NotAnArray),
    };

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let entry: CatalogEntry = serde_json::from_value(entry)
            .map_err(|error| CatalogFileError::InvalidEntry { index, message: error.to_string() })?;
        let record = entry
            .into_record()
            .map_err(|error| CatalogFileError::InvalidEntry { index, message: error.to_string() })?;
        records.push(record);
    }

    info!(path = %path.display(), count = records.len(), "catalog file loaded");
    Ok(records)
}

pub fn export_catalog_file(path: &Path, records: &[EmojiRecord]) -> Result<(), CatalogFileError> {
    let entries: Vec<CatalogEntry> = records.iter().map(CatalogEntry::from_record).collect();
    let json = serde_json::to_string_pretty(&entries)
        .map_err(|error| CatalogFileError::InvalidJson(error.to_string()))?;
    std::fs::write(path, json).map_err(CatalogFileError::Write)?;

    info!(path = %path.display(), count = records.len(), "catalog file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{export_catalog_file, load_catalog_file, CatalogFileError};
    use crate::domain::{EmojiRecord, EmotionTone};
    use crate::test_support::vector_of;

    #[test]
    fn missing_file_malformed_json_and_wrong_shape_are_distinguishable() {
        let dir = tempfile::tempdir().expect("temp dir");

        let missing = load_catalog_file(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(CatalogFileError::NotFound(_))));

        let malformed = dir.path().join("malformed.json");
        std::fs::write(&malformed, "{ not json").expect("write");
        assert!(matches!(load_catalog_file(&malformed), Err(CatalogFileError::InvalidJson(_))));

        let object = dir.path().join("object.json");
        std::fs::write(&object, r#"{"code": ":x:"}"#).expect("write");
        assert!(matches!(load_catalog_file(&object), Err(CatalogFileError::NotAnArray)));
    }

    #[test]
    fn invalid_entries_report_their_index() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[
                {"code": ":ok:", "description": "fine"},
                {"code": ":broken:"}
            ]"#,
        )
        .expect("write");

        let result = load_catalog_file(&path);
        assert!(matches!(result, Err(CatalogFileError::InvalidEntry { index: 1, .. })));
    }

    #[test]
    fn entry_validation_failures_are_also_indexed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"code": ":ok:", "description": "fine", "priority": 99}]"#,
        )
        .expect("write");

        let result = load_catalog_file(&path);
        assert!(matches!(result, Err(CatalogFileError::InvalidEntry { index: 0, .. })));
    }

    #[test]
    fn export_then_load_preserves_catalog_fields() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("catalog.json");

        let records = vec![
            EmojiRecord::new(":joy:", "pure joy")
                .expect("valid record")
                .with_category("emotions")
                .with_emotion_tone(EmotionTone::Positive)
                .with_usage_scene("celebration")
                .with_priority(5)
                .expect("valid priority")
                .with_embedding(vector_of(0.5)),
            EmojiRecord::new(":dot:", "a dot").expect("valid record"),
        ];

        export_catalog_file(&path, &records).expect("export succeeds");
        let loaded = load_catalog_file(&path).expect("load succeeds");

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], records[0]);
        assert_eq!(loaded[1].priority, 1, "missing priority defaults to 1");
        assert!(loaded[1].embedding.is_none());
    }

    #[test]
    fn defaults_apply_to_minimal_entries() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"[{"code": ":min:", "description": "bare minimum"}]"#)
            .expect("write");

        let loaded = load_catalog_file(&path).expect("load succeeds");
        assert_eq!(loaded[0].priority, 1);
        assert!(loaded[0].category.is_none());
        assert!(loaded[0].emotion_tone.is_none());
    }
}
