//! OpenAI-compatible dual-protocol adapter.
//!
//! Prefers the newer single-endpoint `/v1/responses` protocol for the
//! canonical first-party host. When that endpoint answers with a 404-like
//! signal and fallback is enabled, the same logical call is transparently
//! reissued against the older `/v1/chat/completions` protocol; the
//! original failure never reaches the caller. OpenAI-compatible but
//! non-canonical hosts use chat completions directly.
//!
//! A single pooled HTTP client per (base URL, credential) pair is built
//! with the adapter and reused for its lifetime, amortizing TLS setup.
//!
//! The retry loop mirrors the shared backoff policy for transient
//! statuses, permits exactly one payload mutation for an
//! unsupported-parameter rejection, and treats all other 4xx as terminal.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::warn;

use super::capabilities;
use super::gate::ConcurrencyGate;
use super::retry::{RetryConfig, RetryState, give_up};
use super::{http_client, retry_after_header};
use crate::telemetry;
use crate::types::{GenerateRequest, GenerateResponse, Protocol, Usage};
use crate::{GatewayError, Result};

/// Canonical first-party base URL; the responses protocol is preferred
/// only here.
const CANONICAL_BASE_URL: &str = "https://api.openai.com";

/// Message fragments that mark an error body as "this endpoint does not
/// exist" even when the status is not a plain 404.
const MISSING_ENDPOINT_TOKENS: &[&str] = &["not found", "unknown endpoint", "does not exist"];

/// Adapter for OpenAI-compatible backends.
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    http: Client,
    gate: ConcurrencyGate,
    retry: RetryConfig,
    chat_fallback: bool,
    prefer_responses: Option<bool>,
}

impl OpenAiProvider {
    /// Create an adapter against the canonical host.
    pub fn new(api_key: impl Into<String>, gate: ConcurrencyGate, retry: RetryConfig) -> Self {
        Self::with_base_url(api_key, CANONICAL_BASE_URL, gate, retry)
    }

    /// Create an adapter against a compatible host (or wiremock in tests).
    ///
    /// The pooled client is keyed by this (base URL, credential) pair; a
    /// different pair means a different adapter and a fresh pool.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        gate: ConcurrencyGate,
        retry: RetryConfig,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: http_client(),
            gate,
            retry,
            chat_fallback: true,
            prefer_responses: None,
        }
    }

    /// Enable or disable the chat-completions fallback (default: enabled).
    pub fn chat_fallback(mut self, enabled: bool) -> Self {
        self.chat_fallback = enabled;
        self
    }

    /// Force the initial protocol choice, overriding the canonical-host
    /// heuristic. Mostly useful against test servers.
    pub fn prefer_responses(mut self, enabled: bool) -> Self {
        self.prefer_responses = Some(enabled);
        self
    }

    fn initial_protocol(&self) -> Protocol {
        let canonical = self.base_url.starts_with(CANONICAL_BASE_URL);
        if self.prefer_responses.unwrap_or(canonical) {
            Protocol::Responses
        } else {
            Protocol::ChatCompletions
        }
    }

    fn endpoint(&self, protocol: Protocol) -> String {
        match protocol {
            Protocol::Responses => format!("{}/v1/responses", self.base_url),
            _ => format!("{}/v1/chat/completions", self.base_url),
        }
    }

    /// Build the outgoing payload for a protocol, with the proactive
    /// capability filter applied and any previously removed parameter
    /// groups stripped again (a protocol switch must not resurrect them).
    fn build_payload(
        &self,
        protocol: Protocol,
        request: &GenerateRequest,
        removed: &[String],
    ) -> Value {
        let mut payload = match protocol {
            Protocol::Responses => {
                let mut p = json!({
                    "model": request.model,
                    "input": request.prompt,
                });
                if let Some(temp) = request.temperature {
                    p["temperature"] = json!(temp);
                }
                if let Some(schema) = &request.schema {
                    p["text"] = json!({
                        "format": {
                            "type": "json_schema",
                            "name": "structured_response",
                            "schema": schema,
                        }
                    });
                }
                p
            }
            _ => {
                let mut p = json!({
                    "model": request.model,
                    "messages": [{"role": "user", "content": request.prompt}],
                });
                if let Some(temp) = request.temperature {
                    p["temperature"] = json!(temp);
                }
                if let Some(schema) = &request.schema {
                    p["response_format"] = json!({
                        "type": "json_schema",
                        "json_schema": {
                            "name": "structured_response",
                            "schema": schema,
                        }
                    });
                }
                p
            }
        };

        capabilities::filter_for_model(&mut payload, &request.model);
        for param in removed {
            if let Some(group) = capabilities::group_for(param) {
                capabilities::strip_group(&mut payload, group);
            }
        }
        payload
    }

    async fn send_once(
        &self,
        protocol: Protocol,
        model: &str,
        payload: &Value,
        deadline: Instant,
    ) -> Result<GenerateResponse> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(GatewayError::DeadlineExceeded);
        }

        let response = self
            .http
            .post(self.endpoint(protocol))
            .timeout(remaining)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::DeadlineExceeded
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_header(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(
                protocol,
                status.as_u16(),
                retry_after,
                &body,
                model,
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::ResponseParse(e.to_string()))?;
        match protocol {
            Protocol::Responses => parse_responses_body(&body, model),
            _ => parse_chat_body(body, model),
        }
    }
}

#[async_trait]
impl super::traits::GenerateProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        deadline: Instant,
    ) -> Result<GenerateResponse> {
        let mut protocol = self.initial_protocol();
        let mut state = RetryState::new(deadline, self.build_payload(protocol, request, &[]));

        loop {
            let permit = self.gate.acquire(deadline).await?;
            let outcome = self
                .send_once(protocol, &request.model, &state.payload, deadline)
                .await;
            drop(permit);

            match outcome {
                Ok(response) => return Ok(response),
                Err(GatewayError::EndpointNotFound { endpoint })
                    if protocol == Protocol::Responses
                        && self.chat_fallback
                        && !state.protocol_switched =>
                {
                    // Transparent downgrade; the 404 never surfaces.
                    metrics::counter!(telemetry::PROTOCOL_FALLBACKS_TOTAL, "provider" => "openai")
                        .increment(1);
                    warn!(
                        provider = "openai",
                        model = %request.model,
                        endpoint = %endpoint,
                        "responses endpoint missing, falling back to chat completions"
                    );
                    state.protocol_switched = true;
                    protocol = Protocol::ChatCompletions;
                    state.payload = self.build_payload(protocol, request, &state.removed);
                }
                Err(GatewayError::UnsupportedParameter { param, .. }) if !state.mutated => {
                    metrics::counter!(telemetry::PARAM_MUTATIONS_TOTAL,
                        "provider" => "openai",
                        "param" => param.clone(),
                    )
                    .increment(1);
                    warn!(
                        provider = "openai",
                        model = %request.model,
                        param = %param,
                        "stripping rejected parameter group and retrying once"
                    );
                    state.mutated = true;
                    let removed = match capabilities::group_for(&param) {
                        Some(group) => capabilities::strip_group(&mut state.payload, group),
                        None => Vec::new(),
                    };
                    state.removed.extend(removed);
                }
                Err(e) if e.is_transient() => {
                    metrics::counter!(telemetry::RETRIES_TOTAL, "provider" => "openai")
                        .increment(1);
                    match self.retry.next_delay(state.attempt, e.retry_after(), deadline) {
                        Some(delay) => {
                            warn!(
                                provider = "openai",
                                model = %request.model,
                                protocol = protocol.as_str(),
                                attempt = state.attempt + 1,
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                "retrying after transient error"
                            );
                            tokio::time::sleep(delay).await;
                            state.attempt += 1;
                        }
                        None => return Err(give_up(state.attempt + 1, deadline, e)),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn classify_error(
    protocol: Protocol,
    status: u16,
    retry_after: Option<Duration>,
    body: &str,
    model: &str,
) -> GatewayError {
    let message = error_message(body);
    let missing_endpoint = status == 404
        || message.as_deref().is_some_and(|m| {
            let lower = m.to_ascii_lowercase();
            MISSING_ENDPOINT_TOKENS.iter().any(|t| lower.contains(t))
        });

    match status {
        401 | 403 => GatewayError::AuthenticationFailed,
        429 => GatewayError::RateLimited { retry_after },
        500..=599 => GatewayError::Server { status },
        400..=499 if missing_endpoint && protocol == Protocol::Responses => {
            GatewayError::EndpointNotFound {
                endpoint: "/v1/responses".to_string(),
            }
        }
        400 => match capabilities::classify_bad_request(body) {
            Some(param) => GatewayError::UnsupportedParameter {
                param,
                model: model.to_string(),
            },
            None => GatewayError::Api {
                status,
                message: message.unwrap_or_else(|| format!("HTTP {status}")),
            },
        },
        _ => GatewayError::Api {
            status,
            message: message.unwrap_or_else(|| format!("HTTP {status}")),
        },
    }
}

fn error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Extract text from a responses-protocol body.
///
/// Prefers the `output_text` convenience field; otherwise walks the
/// `output` segment list, taking text from assistant messages and
/// ignoring echoed-input segments.
fn parse_responses_body(body: &Value, model: &str) -> Result<GenerateResponse> {
    let mut text = body
        .get("output_text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if text.is_empty() {
        let segments = body.get("output").and_then(Value::as_array);
        let Some(segments) = segments else {
            return Err(GatewayError::ResponseParse(
                "neither output_text nor output present".to_string(),
            ));
        };
        for segment in segments {
            if segment.get("type").and_then(Value::as_str) != Some("message") {
                continue;
            }
            if let Some(role) = segment.get("role").and_then(Value::as_str)
                && role != "assistant"
            {
                continue;
            }
            let content = segment
                .get("content")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let message_text: String = content
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("output_text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect();
            if !message_text.is_empty() {
                text = message_text;
                break;
            }
        }
    }

    if text.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }

    let usage = body.get("usage").map(|u| Usage {
        input_tokens: u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
        output_tokens: u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
        total_tokens: u.get("total_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
    });

    Ok(GenerateResponse {
        text,
        usage,
        model: body
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(model.to_string())),
        protocol: Some(Protocol::Responses),
    })
}

fn parse_chat_body(body: Value, model: &str) -> Result<GenerateResponse> {
    let parsed: ChatCompletionResponse =
        serde_json::from_value(body).map_err(|e| GatewayError::ResponseParse(e.to_string()))?;

    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    if text.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }

    let usage = parsed.usage.map(|u| Usage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(GenerateResponse {
        text,
        usage,
        model: parsed.model.or_else(|| Some(model.to_string())),
        protocol: Some(Protocol::ChatCompletions),
    })
}

// ============================================================================
// Wire types (chat completions)
// ============================================================================

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
