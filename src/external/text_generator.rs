use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextGenError {
    #[error("provider timed out")]
    Timeout,

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("rate limited")]
    RateLimited,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Generative text provider. `model` selects one candidate of the fallback
/// chain; callers decide how failures advance the chain.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, TextGenError>;
}
