use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::vector::EmbeddingVector;
use crate::errors::ValidationError;

/// Slack caps emoji names at 100 characters including the colons.
pub const MAX_CODE_LENGTH: usize = 100;
pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 10;
pub const DEFAULT_PRIORITY: i32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionTone {
    Positive,
    Negative,
    Neutral,
}

impl EmotionTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for EmotionTone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmotionTone {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(ValidationError::EmotionTone(other.to_owned())),
        }
    }
}

/// A catalog entry: one Slack emoji plus the description its embedding is
/// derived from.
///
/// `id` and the timestamps are assigned by the store on write; `embedding`
/// stays `None` until the vectorization pipeline fills it in. Equality and
/// hashing cover the semantic fields only (code, description, category,
/// emotion_tone, usage_scene, priority).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmojiRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub code: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_tone: Option<EmotionTone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_scene: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl EmojiRecord {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Result<Self, ValidationError> {
        let record = Self {
            id: None,
            code: code.into(),
            description: description.into().trim().to_owned(),
            category: None,
            emotion_tone: None,
            usage_scene: None,
            priority: DEFAULT_PRIORITY,
            embedding: None,
            created_at: None,
            updated_at: None,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_emotion_tone(mut self, tone: EmotionTone) -> Self {
        self.emotion_tone = Some(tone);
        self
    }

    pub fn with_usage_scene(mut self, scene: impl Into<String>) -> Self {
        self.usage_scene = Some(scene.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Result<Self, ValidationError> {
        validate_priority(priority)?;
        self.priority = priority;
        Ok(self)
    }

    pub fn with_embedding(mut self, embedding: EmbeddingVector) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Re-checks every construction invariant. Deserialized records must be
    /// passed through this before they are trusted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_code(&self.code)?;
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        validate_priority(self.priority)?;
        Ok(())
    }

    /// The emoji name Slack's reactions API expects: the code without the
    /// surrounding colons.
    pub fn reaction_name(&self) -> &str {
        self.code.trim_matches(':')
    }
}

fn validate_code(code: &str) -> Result<(), ValidationError> {
    let reject = |reason: &str| {
        Err(ValidationError::EmojiCode { code: code.to_owned(), reason: reason.to_owned() })
    };

    if code.is_empty() {
        return reject("code is required");
    }
    if code.len() > MAX_CODE_LENGTH {
        return reject("exceeds maximum length of 100");
    }
    let inner = match code.strip_prefix(':').and_then(|rest| rest.strip_suffix(':')) {
        Some(inner) => inner,
        None => return reject("must be wrapped in colons, like `:smile:`"),
    };
    if inner.is_empty() || inner.contains(':') {
        return reject("must contain one or more non-colon characters between the colons");
    }
    Ok(())
}

fn validate_priority(priority: i32) -> Result<(), ValidationError> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(ValidationError::Priority(priority));
    }
    Ok(())
}

impl PartialEq for EmojiRecord {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.description == other.description
            && self.category == other.category
            && self.emotion_tone == other.emotion_tone
            && self.usage_scene == other.usage_scene
            && self.priority == other.priority
    }
}

impl Eq for EmojiRecord {}

impl Hash for EmojiRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
        self.description.hash(state);
        self.category.hash(state);
        self.emotion_tone.hash(state);
        self.usage_scene.hash(state);
        self.priority.hash(state);
    }
}

/// An [`EmojiRecord`] annotated with the similarity score of one query.
/// Query-result only; never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct EmojiCandidate {
    pub record: EmojiRecord,
    pub similarity_score: f32,
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use super::{EmojiRecord, EmotionTone, MAX_CODE_LENGTH};
    use crate::domain::vector::{EmbeddingVector, EMBEDDING_DIMENSION};
    use crate::errors::ValidationError;

    #[test]
    fn accepts_a_well_formed_code() {
        let record = EmojiRecord::new(":smile:", "a happy face").expect("valid record");

        assert_eq!(record.code, ":smile:");
        assert_eq!(record.priority, 1);
        assert_eq!(record.reaction_name(), "smile");
        assert!(record.id.is_none());
        assert!(record.embedding.is_none());
    }

    #[test]
    fn rejects_codes_without_colon_wrapping() {
        for bad in ["smile", ":smile", "smile:", "::", ":sm:ile:", ""] {
            let result = EmojiRecord::new(bad, "desc");
            assert!(
                matches!(result, Err(ValidationError::EmojiCode { .. })),
                "expected `{bad}` to be rejected"
            );
        }
    }

    #[test]
    fn rejects_codes_over_the_length_limit() {
        let code = format!(":{}:", "x".repeat(MAX_CODE_LENGTH));

        assert!(matches!(
            EmojiRecord::new(code, "desc"),
            Err(ValidationError::EmojiCode { .. })
        ));
    }

    #[test]
    fn rejects_blank_descriptions() {
        assert_eq!(
            EmojiRecord::new(":smile:", "   ").err(),
            Some(ValidationError::EmptyDescription)
        );
    }

    #[test]
    fn rejects_out_of_range_priorities() {
        let record = EmojiRecord::new(":smile:", "desc").expect("valid record");

        assert_eq!(record.clone().with_priority(0).err(), Some(ValidationError::Priority(0)));
        assert_eq!(record.clone().with_priority(11).err(), Some(ValidationError::Priority(11)));
        assert_eq!(record.with_priority(10).expect("in range").priority, 10);
    }

    #[test]
    fn equality_ignores_id_timestamps_and_embedding() {
        let base = EmojiRecord::new(":smile:", "a happy face")
            .expect("valid record")
            .with_emotion_tone(EmotionTone::Positive);

        let mut persisted = base.clone();
        persisted.id = Some(42);
        persisted.created_at = Some(chrono::Utc::now());
        persisted.embedding =
            Some(EmbeddingVector::new(vec![0.1; EMBEDDING_DIMENSION]).expect("valid dimension"));

        assert_eq!(base, persisted);
        assert_eq!(hash_of(&base), hash_of(&persisted));

        let different = base.clone().with_category("faces");
        assert_ne!(base, different);
    }

    #[test]
    fn emotion_tone_round_trips_through_strings() {
        assert_eq!("positive".parse::<EmotionTone>().expect("parses"), EmotionTone::Positive);
        assert_eq!(EmotionTone::Neutral.to_string(), "neutral");
        assert!(matches!(
            "joyful".parse::<EmotionTone>(),
            Err(ValidationError::EmotionTone(_))
        ));
    }

    fn hash_of(record: &EmojiRecord) -> u64 {
        let mut hasher = DefaultHasher::new();
        record.hash(&mut hasher);
        hasher.finish()
    }
}
