//! Retry configuration and per-call deadline/backoff accounting.
//!
//! Provides [`RetryConfig`], the pure scheduling policy consulted by each
//! adapter's retry loop, and [`RetryState`], the per-call record of
//! attempts, payload mutations, and one-shot transitions.
//!
//! The policy owns no I/O: it computes delays, the adapters sleep.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::GatewayError;

/// Configuration for retry behaviour on transient errors.
///
/// Uses jittered exponential backoff, overridden by a server-supplied
/// `Retry-After` delay when one is present, and always clamped to the
/// call's fixed wall-clock deadline.
///
/// ```rust
/// # use munin::providers::retry::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200))
///     .jitter(true);
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 4.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
    /// Whether to add uniform random jitter in `[0, initial_delay)`.
    /// Default: true.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Backoff delay for a given attempt number (0-indexed), before
    /// deadline clamping: `initial * 2^attempt + jitter`, capped at
    /// `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        let jitter = if self.jitter {
            self.initial_delay.mul_f64(rand::random::<f64>())
        } else {
            Duration::ZERO
        };
        base.saturating_add(jitter).min(self.max_delay)
    }

    /// Compute the next sleep, or `None` when the call must stop.
    ///
    /// `attempt` is 0-indexed (the attempt that just failed). A
    /// server-supplied `retry_after` takes precedence over the computed
    /// backoff; either way the sleep is clamped to the budget remaining
    /// before `deadline`. Returns `None` when attempts are exhausted or
    /// no budget remains — the caller surfaces a typed error and makes
    /// no further network calls.
    pub fn next_delay(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        deadline: Instant,
    ) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return None;
        }
        let delay = retry_after.unwrap_or_else(|| self.delay_for_attempt(attempt));
        Some(delay.min(remaining))
    }
}

/// Terminal error when a retry loop stops: the deadline elapsed, or the
/// attempt budget ran out first.
pub(crate) fn give_up(attempts: u32, deadline: Instant, last: GatewayError) -> GatewayError {
    if Instant::now() >= deadline {
        GatewayError::DeadlineExceeded
    } else {
        GatewayError::AttemptsExhausted {
            attempts,
            last: Box::new(last),
        }
    }
}

/// Per-call retry bookkeeping, owned by exactly one in-flight call.
///
/// The deadline is fixed at call start and never extended. The payload is
/// the current outgoing JSON body; capability mutation rewrites it in
/// place and latches `mutated` so a second rejection is terminal. The
/// protocol switch latches the same way.
#[derive(Debug)]
pub struct RetryState {
    /// 0-indexed count of completed attempts.
    pub attempt: u32,
    /// Absolute wall-clock deadline for the whole logical call.
    pub deadline: Instant,
    /// Current outgoing payload; rebuilt on protocol switch, trimmed on
    /// capability mutation.
    pub payload: Value,
    /// Parameter names removed from the payload so far.
    pub removed: Vec<String>,
    /// Whether the one permitted capability mutation has happened.
    pub mutated: bool,
    /// Whether the one permitted protocol fallback has happened.
    pub protocol_switched: bool,
}

impl RetryState {
    pub fn new(deadline: Instant, payload: Value) -> Self {
        Self {
            attempt: 0,
            deadline,
            payload,
            removed: Vec::new(),
            mutated: false,
            protocol_switched: false,
        }
    }
}
