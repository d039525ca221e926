//! Crate-wide error types.
//!
//! Every downstream crate defines its own `thiserror` enum for its local
//! failure modes and provides `impl From<LocalError> for Error`, so the
//! coordinator can propagate with `?` across crate boundaries without a
//! central "god enum" (mirrors the teacher's `LlmError` -> `voice_agent_core::Error`
//! bridge).

use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by a provider operation (STT, LLM, Moderation, Chat).
///
/// Carries the retryable flag and provider tag explicitly per the external
/// interface contract, rather than inferring retryability from the error's
/// variant — a network blip and an auth failure both surface through the
/// same provider and must be told apart by the provider itself.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn retryable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self { provider: provider.into(), message: message.into(), retryable: true }
    }

    pub fn fatal(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self { provider: provider.into(), message: message.into(), retryable: false }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({})",
            self.provider,
            self.message,
            if self.retryable { "retryable" } else { "fatal" }
        )
    }
}

impl std::error::Error for ProviderError {}

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("speech-to-text error: {0}")]
    Stt(String),

    #[error("language model error: {0}")]
    Llm(String),

    #[error("moderation error: {0}")]
    Moderation(String),

    #[error("chat provider error: {0}")]
    Chat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("all providers failed: {0}")]
    AllProvidersFailed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        Error::Internal(err.to_string())
    }
}
