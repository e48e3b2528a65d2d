//! Telemetry metric name constants.
//!
//! Centralised metric names for munin operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `munin_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider` — adapter name (e.g. "gemini", "openai", "stub")
//! - `protocol` — wire protocol that served the call
//! - `status` — outcome: "ok" or "error"
//! - `direction` — token direction: "input" or "output"

/// Total generate calls dispatched through the gateway.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "munin_requests_total";

/// Generate call duration in seconds, including retries.
///
/// Labels: `provider`.
pub const REQUEST_DURATION_SECONDS: &str = "munin_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "munin_retries_total";

/// Total responses→chat-completions protocol fallbacks.
///
/// Labels: `provider`.
pub const PROTOCOL_FALLBACKS_TOTAL: &str = "munin_protocol_fallbacks_total";

/// Total payload mutations after an unsupported-parameter rejection.
///
/// Labels: `provider`, `param`.
pub const PARAM_MUTATIONS_TOTAL: &str = "munin_param_mutations_total";

/// Total tokens consumed.
///
/// Labels: `model`, `direction` ("input" | "output").
pub const TOKENS_TOTAL: &str = "munin_tokens_total";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "munin_cache_hits_total";

/// Total response cache misses.
pub const CACHE_MISSES_TOTAL: &str = "munin_cache_misses_total";
