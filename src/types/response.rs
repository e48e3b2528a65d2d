//! Response types for generate calls.

use serde::{Deserialize, Serialize};

/// Non-streaming generate response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Generated text.
    pub text: String,

    /// Token usage, when the provider reported it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Model that served the call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Wire protocol that served the call. `None` for cache hits, which
    /// never reach a provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// Wire protocol variants the gateway speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Gemini-style `generateContent` endpoint.
    GenerateContent,
    /// OpenAI-style `/v1/responses` endpoint.
    Responses,
    /// OpenAI-style `/v1/chat/completions` endpoint.
    ChatCompletions,
    /// Offline stub, no network.
    Stub,
}

impl Protocol {
    /// Stable label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::GenerateContent => "generate_content",
            Protocol::Responses => "responses",
            Protocol::ChatCompletions => "chat_completions",
            Protocol::Stub => "stub",
        }
    }
}
