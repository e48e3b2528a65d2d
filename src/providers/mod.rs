//! Provider adapters and the shared machinery around them.
//!
//! One adapter per backend protocol — [`GeminiProvider`],
//! [`OpenAiProvider`] (responses with chat-completions fallback), and the
//! offline [`StubProvider`] — plus the pieces every adapter shares: the
//! [`ConcurrencyGate`], the retry/backoff policy, and the capability
//! filter.

pub mod capabilities;
pub mod gate;
pub mod gemini;
pub mod openai;
pub mod retry;
pub mod stub;
pub mod traits;

use std::time::Duration;

pub use gate::{ConcurrencyGate, DEFAULT_MAX_CONCURRENT, SlotPermit};
pub use gemini::{BearerToken, GeminiAuth, GeminiProvider, TokenSource};
pub use openai::OpenAiProvider;
pub use retry::{RetryConfig, RetryState};
pub use stub::StubProvider;
pub use traits::GenerateProvider;

/// Idle connections kept alive per host.
const POOL_MAX_IDLE_PER_HOST: usize = 4;

/// Idle connection expiry.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Build the long-lived HTTP client an adapter reuses for its lifetime.
///
/// Keep-alive and a bounded idle pool amortize TLS/connection setup
/// across calls. Per-attempt timeouts are set on each request from the
/// call's remaining deadline, not here.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .expect("failed to build HTTP client")
}

/// Parse a numeric `Retry-After` header into a duration.
pub(crate) fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
