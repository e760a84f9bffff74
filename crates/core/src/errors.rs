use thiserror::Error;

use crate::resilience::{BreakerError, Retryable, RetryError};

/// Bad input shape. Never retried; always surfaced to the immediate caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid embedding dimension: expected {expected}, got {actual}")]
    EmbeddingDimension { expected: usize, actual: usize },
    #[error("search text cannot be empty")]
    EmptySearchText,
    #[error("invalid emoji code `{code}`: {reason}")]
    EmojiCode { code: String, reason: String },
    #[error("emoji description cannot be empty")]
    EmptyDescription,
    #[error("invalid emotion tone `{0}` (expected positive|negative|neutral)")]
    EmotionTone(String),
    #[error("invalid priority {0}: must be between 1 and 10")]
    Priority(i32),
    #[error("user_id cannot be empty")]
    EmptyUserId,
    #[error("username cannot be empty")]
    EmptyUsername,
    #[error("invalid permission level `{0}` (expected viewer|editor|admin)")]
    PermissionLevel(String),
}

/// Failures raised by an [`EmojiStore`](crate::store::EmojiStore) or
/// [`AdminStore`](crate::store::AdminStore) implementation.
///
/// Integrity violations (`DuplicateCode`) are kept distinct from generic
/// operation failures so callers can react differently to "code already
/// exists" and "connection lost".
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("emoji code `{0}` already exists")]
    DuplicateCode(String),
    #[error("emoji `{0}` not found")]
    NotFound(String),
    #[error("store operation failed: {0}")]
    Operation(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Failures raised by an [`EmbeddingProvider`](crate::provider::EmbeddingProvider).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("embedding provider rate limited: {0}")]
    RateLimited(String),
    #[error("embedding provider authentication failed: {0}")]
    Auth(String),
    #[error("embedding provider request failed: {0}")]
    Api(String),
    #[error("embedding retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
    #[error("embedding provider circuit breaker is open")]
    BreakerOpen,
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Api(_))
    }
}

impl From<RetryError<ProviderError>> for ProviderError {
    fn from(value: RetryError<ProviderError>) -> Self {
        match value {
            RetryError::Exhausted { attempts, source } => {
                Self::RetriesExhausted { attempts, last_error: source.to_string() }
            }
            RetryError::Fatal(source) => source,
        }
    }
}

impl From<BreakerError<ProviderError>> for ProviderError {
    fn from(value: BreakerError<ProviderError>) -> Self {
        match value {
            BreakerError::Open => Self::BreakerOpen,
            BreakerError::Inner(source) => source,
        }
    }
}

/// Failures surfaced by [`SimilarityRanker`](crate::ranker::SimilarityRanker).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Provider(ProviderError),
    #[error("similarity search rejected: circuit breaker is open")]
    BreakerOpen,
    #[error("no embedding provider is configured for text search")]
    ProviderNotConfigured,
}

impl From<BreakerError<StoreError>> for SearchError {
    fn from(value: BreakerError<StoreError>) -> Self {
        match value {
            BreakerError::Open => Self::BreakerOpen,
            BreakerError::Inner(source) => Self::Store(source),
        }
    }
}

impl From<ProviderError> for SearchError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::BreakerOpen => Self::BreakerOpen,
            other => Self::Provider(other),
        }
    }
}

/// Failures that abort a batch vectorization run.
///
/// Per-row failures inside a tolerant run are logged and counted instead of
/// being raised as this type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
