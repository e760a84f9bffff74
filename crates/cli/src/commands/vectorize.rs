use std::str::FromStr;
use std::sync::Arc;

use reacji_core::config::{AppConfig, LoadOptions};
use reacji_core::domain::EmotionTone;
use reacji_core::embedding_cache::EmbeddingCache;
use reacji_core::pipeline::{BatchEmbeddingPipeline, VectorizeOptions, VectorizeOutcome};
use reacji_core::resilience::RetryPolicy;
use reacji_db::{connect_with_settings, SqlEmojiStore};
use reacji_embedding::OpenAiEmbeddingClient;

use crate::commands::{build_runtime, CommandResult};

#[derive(Debug)]
pub struct VectorizeArgs {
    pub skip_existing: bool,
    pub category: Option<String>,
    pub emotion_tone: Option<String>,
    pub dry_run: bool,
    pub batch_size: Option<usize>,
    pub continue_on_error: bool,
}

pub fn run(args: VectorizeArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "vectorize",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let emotion_tone = match args.emotion_tone.as_deref().map(EmotionTone::from_str).transpose() {
        Ok(tone) => tone,
        Err(error) => {
            return CommandResult::failure("vectorize", "invalid_argument", error.to_string(), 2);
        }
    };

    let provider = match OpenAiEmbeddingClient::from_config(&config.embedding) {
        Ok(provider) => Arc::new(provider),
        Err(error) => {
            return CommandResult::failure(
                "vectorize",
                "embedding_provider",
                format!("embedding provider unavailable: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("vectorize") {
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
        let embedder = if config.embedding.cache_capacity == 0 {
            EmbeddingCache::new(provider, RetryPolicy::none())
        } else {
            EmbeddingCache::with_capacity(
                provider,
                RetryPolicy::none(),
                config.embedding.cache_capacity,
            )
        };
        let pipeline = BatchEmbeddingPipeline::new(store, Arc::new(embedder));

        let summary = if let Some(batch_size) = args.batch_size {
            let report = pipeline
                .vectorize_batch(batch_size, args.continue_on_error)
                .await
                .map_err(|error| ("pipeline", error.to_string(), 5u8))?;
            format!(
                "batched vectorization finished: {} embedded, {} failed",
                report.successful, report.failed
            )
        } else {
            let options = VectorizeOptions {
                skip_existing: args.skip_existing,
                category: args.category.clone(),
                emotion_tone,
                dry_run: args.dry_run,
            };
            let outcome = pipeline
                .vectorize_all(&options, |current, planned, code| {
                    eprintln!("[{current}/{planned}] {code}");
                })
                .await
                .map_err(|error| ("pipeline", error.to_string(), 5u8))?;

            match outcome {
                VectorizeOutcome::DryRun { would_process, skipped, filtered_out, total } => {
                    format!(
                        "dry run: {would_process} of {total} entries would be embedded \
                         ({skipped} skipped, {filtered_out} filtered out)"
                    )
                }
                VectorizeOutcome::Completed(report) => format!(
                    "vectorization finished: {} embedded, {} skipped, {} filtered out of {}",
                    report.processed, report.skipped, report.filtered_out, report.total
                ),
            }
        };

        pool.close().await;
        Ok::<String, (&'static str, String, u8)>(summary)
    });

    match result {
        Ok(summary) => CommandResult::success("vectorize", summary),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("vectorize", error_class, message, exit_code)
        }
    }
}
