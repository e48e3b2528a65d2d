//! Munin error types

use std::time::Duration;

/// Munin error types
///
/// Adapters classify every provider failure into one of these variants;
/// retry loops consult [`is_transient()`](GatewayError::is_transient) and
/// [`retry_after()`](GatewayError::retry_after) to decide what to do next.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    // Provider/network errors
    /// Connection or read failure with no HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP 429. Carries the server-supplied delay when one was sent.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// HTTP 5xx. Retried like a rate limit, without a server hint.
    #[error("server error (HTTP {status})")]
    Server { status: u16 },

    #[error("authentication failed")]
    AuthenticationFailed,

    /// Terminal HTTP error status — anything not covered by a more
    /// specific variant. Never retried.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP 400 that names a request parameter the model rejects.
    /// The adapter mutates the payload and retries exactly once.
    #[error("unsupported parameter '{param}' for model '{model}'")]
    UnsupportedParameter { param: String, model: String },

    /// 404-like signal from the responses endpoint. Triggers one
    /// protocol fallback when enabled; otherwise terminal.
    #[error("endpoint not found: {endpoint}")]
    EndpointNotFound { endpoint: String },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response from model")]
    EmptyResponse,

    /// The provider answered 2xx but the body was unusable. Distinct from
    /// a refusal so callers can tell "provider said no" from "provider's
    /// answer was garbage". Not retried.
    #[error("unparseable provider response: {0}")]
    ResponseParse(String),

    // Budget errors
    /// The call's wall-clock deadline elapsed — during slot acquisition,
    /// a send, or a backoff sleep. No request is issued past the deadline.
    #[error("call deadline exceeded")]
    DeadlineExceeded,

    /// Retries ran out before the deadline did.
    #[error("gave up after {attempts} attempts: {last}")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        last: Box<GatewayError>,
    },

    // Configuration errors
    #[error("no provider configured")]
    NoProvider,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Whether this failure is likely to succeed on retry.
    ///
    /// Transport failures, rate limits, and 5xx are transient; everything
    /// else is terminal for the current attempt strategy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport(_)
                | GatewayError::RateLimited { .. }
                | GatewayError::Server { .. }
        )
    }

    /// Server-supplied retry delay, if the provider sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Munin operations
pub type Result<T> = std::result::Result<T, GatewayError>;
