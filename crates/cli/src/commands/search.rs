use std::str::FromStr;
use std::sync::Arc;

use reacji_core::config::{AppConfig, LoadOptions};
use reacji_core::domain::EmotionTone;
use reacji_core::embedding_cache::EmbeddingCache;
use reacji_core::ranker::SimilarityRanker;
use reacji_core::resilience::{CircuitBreaker, RetryPolicy};
use reacji_core::store::SearchFilters;
use reacji_db::{connect_with_settings, SqlEmojiStore};
use reacji_embedding::OpenAiEmbeddingClient;

use crate::commands::{build_runtime, CommandResult};

pub fn run(
    text: &str,
    limit: Option<usize>,
    category: Option<String>,
    emotion_tone: Option<String>,
) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "search",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let emotion_tone = match emotion_tone.as_deref().map(EmotionTone::from_str).transpose() {
        Ok(tone) => tone,
        Err(error) => {
            return CommandResult::failure("search", "invalid_argument", error.to_string(), 2);
        }
    };
    let filters = SearchFilters { emotion_tone, category, usage_scene: None };
    let limit = limit.unwrap_or(config.search.default_limit);

    let provider = match OpenAiEmbeddingClient::from_config(&config.embedding) {
        Ok(provider) => Arc::new(provider),
        Err(error) => {
            return CommandResult::failure(
                "search",
                "embedding_provider",
                format!("embedding provider unavailable: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("search") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let store = Arc::new(SqlEmojiStore::new(pool.clone()));
        // The provider retries internally; the cache must not retry on top.
        let embedder = Arc::new(EmbeddingCache::new(provider, RetryPolicy::none()));
        let ranker = SimilarityRanker::with_breaker(
            store,
            CircuitBreaker::new(
                config.search.breaker_failure_threshold,
                config.search.breaker_timeout(),
            ),
        )
        .with_embedder(embedder);

        let candidates = ranker
            .find_similar_by_text(text, limit, &filters)
            .await
            .map_err(|error| ("search", error.to_string(), 5u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(candidates)
    });

    match result {
        Ok(candidates) if candidates.is_empty() => {
            CommandResult::success("search", format!("no matches for `{text}`"))
        }
        Ok(candidates) => {
            let lines: Vec<String> = candidates
                .iter()
                .map(|candidate| {
                    format!(
                        "{} {:.4} {}",
                        candidate.record.code,
                        candidate.similarity_score,
                        candidate.record.description
                    )
                })
                .collect();
            CommandResult::success("search", lines.join("\n"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("search", error_class, message, exit_code)
        }
    }
}
