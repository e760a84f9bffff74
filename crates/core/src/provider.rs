use async_trait::async_trait;

use crate::domain::{EmbeddingVector, EMBEDDING_DIMENSION};
use crate::errors::ProviderError;

/// Contract for the external embedding API.
///
/// Callers are responsible for whitespace-normalizing text before
/// submission (see [`crate::embedding_cache::normalize_text`]).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text with the provider's default model.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ProviderError>;

    /// Embeds a single text with an explicit model override.
    async fn embed_with_model(
        &self,
        text: &str,
        model: &str,
    ) -> Result<EmbeddingVector, ProviderError>;

    /// Embeds many texts in one provider round-trip. The result has one
    /// vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError>;

    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }
}
