//! Resolved request passed to provider adapters.

use serde_json::Value;

/// A generate call after the gateway has resolved defaults.
///
/// Constructed once per call and never mutated; adapters derive their
/// wire payloads from it (the mutable per-attempt payload lives in
/// [`RetryState`](crate::providers::retry::RetryState)).
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Prompt text.
    pub prompt: String,
    /// Resolved model identifier.
    pub model: String,
    /// Structured-output schema hint.
    pub schema: Option<Value>,
    /// Sampling temperature, if the caller set one.
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            schema: None,
            temperature: None,
        }
    }
}
