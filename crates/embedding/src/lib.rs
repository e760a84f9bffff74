pub mod openai;

pub use openai::{OpenAiEmbeddingClient, PROVIDER_BREAKER_THRESHOLD, PROVIDER_BREAKER_TIMEOUT};
