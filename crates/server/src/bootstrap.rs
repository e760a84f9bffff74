use std::sync::Arc;

use reacji_core::catalog_cache::EmojiCatalogCache;
use reacji_core::config::{AppConfig, ConfigError, LoadOptions};
use reacji_core::embedding_cache::EmbeddingCache;
use reacji_core::errors::{ProviderError, StoreError};
use reacji_core::permissions::PermissionChecker;
use reacji_core::pipeline::BatchEmbeddingPipeline;
use reacji_core::ranker::SimilarityRanker;
use reacji_core::resilience::{CircuitBreaker, RetryPolicy};
use reacji_core::store::EmojiStore;
use reacji_db::{connect_with_settings, migrations, DbPool, SqlAdminStore, SqlEmojiStore};
use reacji_embedding::OpenAiEmbeddingClient;
use reacji_slack::commands::{CatalogCommandService, SlashCommandHandler};
use reacji_slack::events::EventDispatcher;
use reacji_slack::reactions::ReactionHandler;
use reacji_slack::socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(
        "slack.app_token and slack.bot_token must be set to run the socket-mode server \
         (catalog-only work goes through the CLI)"
    )]
    MissingSlackTokens,
    #[error("embedding.api_key must be set to run the socket-mode server")]
    MissingEmbeddingApiKey,
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("embedding provider setup failed: {0}")]
    EmbeddingProvider(#[from] ProviderError),
    #[error("catalog cache warm-up failed: {0}")]
    CatalogWarm(#[source] StoreError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    if config.slack.app_token.expose_secret().is_empty()
        || config.slack.bot_token.expose_secret().is_empty()
    {
        return Err(BootstrapError::MissingSlackTokens);
    }
    if config.embedding.api_key.is_none() {
        return Err(BootstrapError::MissingEmbeddingApiKey);
    }

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let store: Arc<dyn EmojiStore> = Arc::new(SqlEmojiStore::new(db_pool.clone()));
    let permissions =
        Arc::new(PermissionChecker::new(Arc::new(SqlAdminStore::new(db_pool.clone()))));

    let provider = Arc::new(OpenAiEmbeddingClient::from_config(&config.embedding)?);
    // The provider retries internally; the cache must not retry on top.
    let embedder = Arc::new(if config.embedding.cache_capacity == 0 {
        EmbeddingCache::new(provider, RetryPolicy::none())
    } else {
        EmbeddingCache::with_capacity(
            provider,
            RetryPolicy::none(),
            config.embedding.cache_capacity,
        )
    });

    let catalog_cache = Arc::new(EmojiCatalogCache::new(store.clone()));
    let warmed = catalog_cache.load_all().await.map_err(BootstrapError::CatalogWarm)?;
    info!(
        event_name = "system.bootstrap.catalog_warmed",
        correlation_id = "bootstrap",
        entries = warmed,
        "emoji catalog cache warmed"
    );

    let ranker = Arc::new(
        SimilarityRanker::with_breaker(
            store.clone(),
            CircuitBreaker::new(
                config.search.breaker_failure_threshold,
                config.search.breaker_timeout(),
            ),
        )
        .with_embedder(embedder.clone()),
    );
    let pipeline = Arc::new(
        BatchEmbeddingPipeline::new(store.clone(), embedder)
            .with_catalog_cache(catalog_cache.clone()),
    );

    let service = CatalogCommandService::new(store, ranker.clone(), permissions.clone())
        .with_pipeline(pipeline)
        .with_catalog_cache(catalog_cache);

    let mut dispatcher = EventDispatcher::new();
    dispatcher
        .register(ReactionHandler::new(ranker).with_max_reactions(config.search.default_limit));
    dispatcher.register(SlashCommandHandler::new(service, permissions));
    info!(
        event_name = "system.bootstrap.handlers_registered",
        correlation_id = "bootstrap",
        handlers = dispatcher.handler_count(),
        "slack event handlers registered"
    );

    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        dispatcher,
        ReconnectPolicy::default(),
    );

    Ok(Application { config, db_pool, slack_runner })
}

#[cfg(test)]
mod tests {
    use reacji_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn overrides(
        app_token: Option<&str>,
        bot_token: Option<&str>,
        api_key: Option<&str>,
    ) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                slack_app_token: app_token.map(str::to_string),
                slack_bot_token: bot_token.map(str::to_string),
                embedding_api_key: api_key.map(str::to_string),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn refuses_to_start_without_slack_tokens() {
        let result = bootstrap(overrides(None, None, Some("sk-test"))).await;

        let error = result.err().expect("bootstrap should fail");
        assert!(matches!(error, BootstrapError::MissingSlackTokens));
        assert!(error.to_string().contains("slack.app_token"));
    }

    #[tokio::test]
    async fn refuses_to_start_without_embedding_api_key() {
        let result = bootstrap(overrides(Some("xapp-test"), Some("xoxb-test"), None)).await;

        let error = result.err().expect("bootstrap should fail");
        assert!(matches!(error, BootstrapError::MissingEmbeddingApiKey));
        assert!(error.to_string().contains("embedding.api_key"));
    }

    #[tokio::test]
    async fn bootstrap_applies_schema_and_wires_the_runner() {
        let app = bootstrap(overrides(Some("xapp-test"), Some("xoxb-test"), Some("sk-test")))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('emojis', 'admin_users')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected catalog tables to be available after bootstrap");
        assert_eq!(table_count, 2, "bootstrap should apply the catalog schema");

        // The noop transport yields no envelopes, so the runner returns at once.
        app.slack_runner.start().await.expect("runner should start and drain cleanly");

        app.db_pool.close().await;
    }
}
