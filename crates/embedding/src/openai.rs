//! OpenAI embeddings client.
//!
//! Every request runs as retry-inside-breaker: the internal circuit breaker
//! counts one failure per call even when that call retried internally. Rate
//! limits and server errors are retryable; authentication failures are not.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use reacji_core::config::EmbeddingConfig;
use reacji_core::domain::{EmbeddingVector, EMBEDDING_DIMENSION};
use reacji_core::errors::ProviderError;
use reacji_core::provider::EmbeddingProvider;
use reacji_core::resilience::{BreakerError, CircuitBreaker, RetryPolicy};

pub const PROVIDER_BREAKER_THRESHOLD: u32 = 3;
pub const PROVIDER_BREAKER_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiEmbeddingClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl OpenAiEmbeddingClient {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::Auth("embedding.api_key is not configured".to_owned()))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|error| ProviderError::Api(error.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            retry: config.retry_policy(),
            breaker: CircuitBreaker::new(PROVIDER_BREAKER_THRESHOLD, PROVIDER_BREAKER_TIMEOUT),
        })
    }

    pub fn is_degraded(&self) -> bool {
        self.breaker.is_open()
    }

    async fn guarded(
        &self,
        model: &str,
        input: EmbeddingInput<'_>,
    ) -> Result<Vec<EmbeddingVector>, ProviderError> {
        match self.breaker.call(|| self.retry.run(|| self.request(model, input))).await {
            Ok(vectors) => Ok(vectors),
            Err(BreakerError::Open) => Err(ProviderError::BreakerOpen),
            Err(BreakerError::Inner(retry_error)) => Err(retry_error.into()),
        }
    }

    async fn request(
        &self,
        model: &str,
        input: EmbeddingInput<'_>,
    ) -> Result<Vec<EmbeddingVector>, ProviderError> {
        let payload =
            EmbeddingRequest { model, input, dimensions: EMBEDDING_DIMENSION };

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|error| ProviderError::Api(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_status(status.as_u16(), &body);
            warn!(status = status.as_u16(), "embedding request failed");
            return Err(error);
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|error| ProviderError::Api(format!("malformed response: {error}")))?;

        let mut data = body.data;
        data.sort_by_key(|entry| entry.index);
        debug!(vectors = data.len(), model, "embedding request completed");

        data.into_iter()
            .map(|entry| {
                EmbeddingVector::new(entry.embedding)
                    .map_err(|error| ProviderError::Api(error.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, ProviderError> {
        let model = self.model.clone();
        let mut vectors = self.guarded(&model, EmbeddingInput::Single(text)).await?;
        vectors
            .pop()
            .ok_or_else(|| ProviderError::Api("response contained no embedding".to_owned()))
    }

    async fn embed_with_model(
        &self,
        text: &str,
        model: &str,
    ) -> Result<EmbeddingVector, ProviderError> {
        let mut vectors = self.guarded(model, EmbeddingInput::Single(text)).await?;
        vectors
            .pop()
            .ok_or_else(|| ProviderError::Api("response contained no embedding".to_owned()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model.clone();
        let vectors = self.guarded(&model, EmbeddingInput::Batch(texts)).await?;
        if vectors.len() != texts.len() {
            return Err(ProviderError::Api(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

fn classify_status(status: u16, body: &str) -> ProviderError {
    let detail = summarize_body(body);
    match status {
        429 => ProviderError::RateLimited(detail),
        401 | 403 => ProviderError::Auth(detail),
        _ => ProviderError::Api(format!("HTTP {status}: {detail}")),
    }
}

fn summarize_body(body: &str) -> String {
    const MAX_DETAIL: usize = 200;
    let trimmed = body.trim();
    if trimmed.len() <= MAX_DETAIL {
        trimmed.to_owned()
    } else {
        let mut end = MAX_DETAIL;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    }
}
