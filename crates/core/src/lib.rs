pub mod catalog_cache;
pub mod catalog_io;
pub mod config;
pub mod domain;
pub mod embedding_cache;
pub mod errors;
pub mod permissions;
pub mod pipeline;
pub mod provider;
pub mod ranker;
pub mod resilience;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog_cache::{CatalogCacheStats, EmojiCatalogCache};
pub use catalog_io::{export_catalog_file, load_catalog_file, CatalogFileError};
pub use config::{
    AppConfig, ConfigError, ConfigOverrides, EmbeddingConfig, LoadOptions, LogFormat,
    SearchConfig,
};
pub use domain::{
    AdminUser, EmbeddingVector, EmojiCandidate, EmojiRecord, EmotionTone, Permission,
    EMBEDDING_DIMENSION,
};
pub use embedding_cache::{normalize_text, EmbeddingCache, DEFAULT_CACHE_CAPACITY};
pub use errors::{
    PipelineError, ProviderError, SearchError, StoreError, ValidationError,
};
pub use permissions::PermissionChecker;
pub use pipeline::{
    BatchEmbeddingPipeline, BatchVectorizeReport, SingleVectorizeResult, VectorizeOptions,
    VectorizeOutcome, VectorizeReport, DEFAULT_BATCH_SIZE,
};
pub use provider::EmbeddingProvider;
pub use ranker::{rank_candidates, SimilarityRanker, DEFAULT_SEARCH_LIMIT};
pub use resilience::{BreakerError, CircuitBreaker, Retryable, RetryError, RetryPolicy};
pub use store::{AdminStore, EmojiStore, SearchFilters};
