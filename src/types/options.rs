//! Per-call options for generate requests.

use serde::{Deserialize, Serialize};

/// Options for a generate call (provider-agnostic).
///
/// Everything is optional; unset fields fall back to gateway-level
/// defaults. Immutable once the call enters the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Model override. Falls back to the gateway's default model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Structured-output schema hint, forwarded in the provider's native
    /// response-format block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,

    /// Task hint selecting a timeout profile (e.g. "extraction" gets a
    /// longer budget than the default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Sampling temperature. Leaving this unset (or setting exactly 0.0)
    /// keeps the call deterministic and therefore cacheable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Cache-partitioning tag. Bump when prompt templates change so stale
    /// cached responses don't leak across prompt revisions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<String>,
}

impl GenerateOptions {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn prompt_version(mut self, version: impl Into<String>) -> Self {
        self.prompt_version = Some(version.into());
        self
    }

    /// Whether the sampling configuration is deterministic.
    ///
    /// Only deterministic calls are eligible for the response cache.
    pub fn is_deterministic(&self) -> bool {
        match self.temperature {
            None => true,
            Some(t) => t == 0.0,
        }
    }
}
