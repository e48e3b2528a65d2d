//! Provider adapter trait.
//!
//! Each backend protocol gets one adapter implementing
//! [`GenerateProvider`]. The set is closed — {Gemini-style, OpenAI
//! dual-protocol, offline stub} — and the gateway selects exactly one at
//! construction from configuration. Adapters own their retry loops (the
//! backoff policy itself lives in [`retry`](super::retry)); the gateway
//! owns caching and usage accounting around them.

use async_trait::async_trait;
use tokio::time::Instant;

use crate::Result;
use crate::types::{GenerateRequest, GenerateResponse};

/// A provider backend that can serve one generate call.
///
/// `generate` covers the whole logical call: every retry, the optional
/// capability mutation, and the optional protocol fallback all happen
/// behind this method, bounded by `deadline`. Only a final, exhausted
/// failure comes back as an error.
#[async_trait]
pub trait GenerateProvider: Send + Sync {
    /// Adapter name for logging and metrics.
    fn name(&self) -> &str;

    /// Run one logical generate call to completion or typed failure.
    ///
    /// Implementations must observe `deadline` at every blocking point —
    /// slot acquisition, the network send, and backoff sleeps — and must
    /// never issue a request after it has passed.
    async fn generate(
        &self,
        request: &GenerateRequest,
        deadline: Instant,
    ) -> Result<GenerateResponse>;
}
