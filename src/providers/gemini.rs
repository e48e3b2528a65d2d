//! Gemini-style `generateContent` adapter.
//!
//! Speaks the REST generation endpoint
//! `POST {base}/{model}:generateContent`, authenticating with either a
//! long-lived API key appended as a query parameter or an OAuth2 bearer
//! token from an ambient [`TokenSource`].
//!
//! The retry loop covers transport errors and transient statuses
//! (429/5xx) within the call's deadline; any other HTTP status fails
//! immediately. Prompt and response text never appear in logs — clinical
//! notes may carry patient data.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::warn;

use super::gate::ConcurrencyGate;
use super::retry::{RetryConfig, RetryState, give_up};
use super::{http_client, retry_after_header};
use crate::telemetry;
use crate::types::{GenerateRequest, GenerateResponse, Protocol, Usage};
use crate::{GatewayError, Result};

/// Default base URL for the Gemini generation API.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// How early a token is considered expired, to avoid racing the expiry
/// on the wire.
const TOKEN_REFRESH_SKEW: Duration = Duration::from_secs(30);

/// A bearer token with its expiry instant.
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub token: String,
    pub expires_at: std::time::Instant,
}

impl BearerToken {
    fn is_expired(&self) -> bool {
        std::time::Instant::now() + TOKEN_REFRESH_SKEW >= self.expires_at
    }
}

/// Ambient credential source for OAuth2 bearer auth.
///
/// A refresh failure is fatal for the call that triggered it — the
/// retry loop never retries a refresh.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetch a fresh bearer token.
    async fn fetch(&self) -> Result<BearerToken>;
}

/// Authentication mode for the Gemini adapter.
#[derive(Clone)]
pub enum GeminiAuth {
    /// Long-lived API key, appended as a `?key=` query parameter.
    ApiKey(String),
    /// OAuth2 bearer tokens, cached until expiry.
    OAuth(Arc<dyn TokenSource>),
}

/// Adapter for the Gemini-style generation endpoint.
pub struct GeminiProvider {
    base_url: String,
    auth: GeminiAuth,
    http: Client,
    gate: ConcurrencyGate,
    retry: RetryConfig,
    token: tokio::sync::Mutex<Option<BearerToken>>,
}

impl GeminiProvider {
    /// Create an adapter against the production endpoint.
    pub fn new(auth: GeminiAuth, gate: ConcurrencyGate, retry: RetryConfig) -> Self {
        Self::with_base_url(auth, DEFAULT_BASE_URL, gate, retry)
    }

    /// Create an adapter with a custom base URL (for testing with wiremock).
    pub fn with_base_url(
        auth: GeminiAuth,
        base_url: impl Into<String>,
        gate: ConcurrencyGate,
        retry: RetryConfig,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            http: http_client(),
            gate,
            retry,
            token: tokio::sync::Mutex::new(None),
        }
    }

    fn url_for(&self, model: &str) -> String {
        match &self.auth {
            GeminiAuth::ApiKey(key) => {
                format!("{}/{}:generateContent?key={}", self.base_url, model, key)
            }
            GeminiAuth::OAuth(_) => format!("{}/{}:generateContent", self.base_url, model),
        }
    }

    /// Current bearer token, refreshed when expired. At most one refresh
    /// per call; a refresh failure propagates untouched.
    async fn bearer(&self, source: &Arc<dyn TokenSource>) -> Result<String> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.clone());
        }
        let fresh = source.fetch().await?;
        let value = fresh.token.clone();
        *slot = Some(fresh);
        Ok(value)
    }

    fn build_payload(&self, request: &GenerateRequest) -> Result<Value> {
        let generation_config = GenerationConfig {
            response_mime_type: request.schema.as_ref().map(|_| "application/json"),
            response_schema: request.schema.as_ref(),
            temperature: request.temperature,
        };
        let body = GenerateContentBody {
            contents: vec![Content {
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config,
        };
        Ok(serde_json::to_value(body)?)
    }

    async fn send_once(
        &self,
        url: &str,
        model: &str,
        payload: &Value,
        deadline: Instant,
    ) -> Result<GenerateResponse> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(GatewayError::DeadlineExceeded);
        }

        let mut builder = self.http.post(url).timeout(remaining).json(payload);
        if let GeminiAuth::OAuth(source) = &self.auth {
            builder = builder.bearer_auth(self.bearer(source).await?);
        }

        let response = builder.send().await.map_err(|e| {
            // The per-attempt timeout equals the remaining budget, so a
            // client timeout means the deadline fired.
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
            return Err(classify_error(status.as_u16(), retry_after, &body));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::ResponseParse(e.to_string()))?;
        extract_text(body, model)
    }
}

#[async_trait]
impl super::traits::GenerateProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        deadline: Instant,
    ) -> Result<GenerateResponse> {
        let url = self.url_for(&request.model);
        let mut state = RetryState::new(deadline, self.build_payload(request)?);

        loop {
            let permit = self.gate.acquire(deadline).await?;
            let outcome = self
                .send_once(&url, &request.model, &state.payload, deadline)
                .await;
            drop(permit);

            match outcome {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() => {
                    metrics::counter!(telemetry::RETRIES_TOTAL, "provider" => "gemini")
                        .increment(1);
                    match self.retry.next_delay(state.attempt, e.retry_after(), deadline) {
                        Some(delay) => {
                            warn!(
                                provider = "gemini",
                                model = %request.model,
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

fn classify_error(status: u16, retry_after: Option<Duration>, body: &str) -> GatewayError {
    match status {
        401 | 403 => GatewayError::AuthenticationFailed,
        429 => GatewayError::RateLimited { retry_after },
        500..=599 => GatewayError::Server { status },
        _ => GatewayError::Api {
            status,
            message: error_message(body).unwrap_or_else(|| format!("HTTP {status}")),
        },
    }
}

/// Pull the provider's error message out of a JSON error body, without
/// echoing the whole body.
fn error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn extract_text(body: GenerateContentResponse, model: &str) -> Result<GenerateResponse> {
    let text: String = body
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.is_empty() {
        return Err(GatewayError::EmptyResponse);
    }

    let usage = body.usage_metadata.map(|u| Usage {
        input_tokens: u.prompt_token_count.unwrap_or(0),
        output_tokens: u.candidates_token_count.unwrap_or(0),
        total_tokens: u.total_token_count.unwrap_or(0),
    });

    Ok(GenerateResponse {
        text,
        usage,
        model: Some(model.to_string()),
        protocol: Some(Protocol::GenerateContent),
    })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct GenerateContentBody<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}
