use std::time::Duration;

use thiserror::Error;

/// Aggregates every failure mode exposed by the streaming pipeline.
///
/// Callers match on the variant to decide whether to retry, answer with a 400, or
/// surface an actionable message to the editor.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Signals validation failures in a request payload or prompt.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Raised by the local rate limiter when the current window is exhausted.
    #[error("rate limit exceeded, retry after {}ms", retry_after.as_millis())]
    RateLimitExceeded {
        /// Time left until the current window resets.
        retry_after: Duration,
    },
    /// Non-2xx answer from an upstream LLM API.
    #[error("provider {provider} returned status {status}: {message}")]
    Provider {
        /// Name of the provider, such as `openai`.
        provider: &'static str,
        /// HTTP status returned by the upstream.
        status: u16,
        /// Message extracted from the provider error envelope, or the raw body.
        message: String,
        /// Raw response body kept verbatim for diagnostics.
        body: String,
    },
    /// The configured provider has no adapter.
    #[error("unsupported LLM provider: {provider}")]
    UnsupportedProvider { provider: String },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// The request deadline elapsed before the upstream finished.
    #[error("request timed out after {}s", elapsed.as_secs())]
    Timeout { elapsed: Duration },
    /// Surfaces cancellations, e.g. a consumer run superseded by a newer one.
    #[error("request aborted: {message}")]
    Aborted { message: String },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use inkstream::error::LLMError;
    ///
    /// let err = LLMError::transport("dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Validation`] from a textual description.
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns `true` for the local rate-limit rejection, the only retryable failure.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimitExceeded { .. })
    }
}
