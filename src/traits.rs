//! Core ModelGateway trait

use async_trait::async_trait;

use crate::types::{GenerateOptions, GenerateResponse};
use crate::Result;

/// The contract the rest of the system depends on.
///
/// Rule engines, extractors, and judges receive a `&dyn ModelGateway`
/// (or a concrete [`Gateway`](crate::gateway::Gateway)) and call
/// `generate`. Whether a failure degrades to "no suggestion" or
/// escalates is each caller's decision — the gateway returns the typed
/// error and never substitutes an empty result.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Generate text for a prompt.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GenerateResponse>;
}
