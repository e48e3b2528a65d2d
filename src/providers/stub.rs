//! Offline stub adapter.
//!
//! Bypasses all network calls and returns a fixed deterministic payload.
//! The rest of the system selects this mode (via configuration) for tests
//! and local runs, so pipelines can execute end-to-end without
//! credentials or connectivity.

use async_trait::async_trait;
use tokio::time::Instant;

use crate::Result;
use crate::types::{GenerateRequest, GenerateResponse, Protocol};

/// Payload returned by default when offline mode is active.
pub const DEFAULT_STUB_TEXT: &str = r#"{"offline":true}"#;

/// Adapter that answers every call with the same canned text.
pub struct StubProvider {
    text: String,
}

impl StubProvider {
    /// Stub returning [`DEFAULT_STUB_TEXT`].
    pub fn new() -> Self {
        Self {
            text: DEFAULT_STUB_TEXT.to_string(),
        }
    }

    /// Stub returning a custom canned payload.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl super::traits::GenerateProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        _deadline: Instant,
    ) -> Result<GenerateResponse> {
        Ok(GenerateResponse {
            text: self.text.clone(),
            usage: None,
            model: Some(request.model.clone()),
            protocol: Some(Protocol::Stub),
        })
    }
}
