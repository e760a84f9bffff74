use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::ValidationError;

/// Output width of the embedding model; every stored and queried vector must
/// carry exactly this many components.
pub const EMBEDDING_DIMENSION: usize = 1536;

/// Fixed-dimension embedding vector. Construction is the validation point:
/// a value of this type always holds exactly [`EMBEDDING_DIMENSION`] floats.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(components: Vec<f32>) -> Result<Self, ValidationError> {
        if components.len() != EMBEDDING_DIMENSION {
            return Err(ValidationError::EmbeddingDimension {
                expected: EMBEDDING_DIMENSION,
                actual: components.len(),
            });
        }
        Ok(Self(components))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Cosine similarity with `other`. Degenerate input (a zero vector)
    /// yields NaN, which scoring layers clamp to 0.0.
    pub fn cosine_similarity(&self, other: &Self) -> f32 {
        let mut dot = 0.0_f32;
        let mut norm_left = 0.0_f32;
        let mut norm_right = 0.0_f32;
        for (left, right) in self.0.iter().zip(other.0.iter()) {
            dot += left * right;
            norm_left += left * left;
            norm_right += right * right;
        }
        dot / (norm_left.sqrt() * norm_right.sqrt())
    }
}

impl TryFrom<Vec<f32>> for EmbeddingVector {
    type Error = ValidationError;

    fn try_from(components: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(components)
    }
}

impl From<EmbeddingVector> for Vec<f32> {
    fn from(vector: EmbeddingVector) -> Self {
        vector.0
    }
}

impl<'de> Deserialize<'de> for EmbeddingVector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let components = Vec::<f32>::deserialize(deserializer)?;
        Self::new(components).map_err(serde::de::Error::custom)
    }
}
