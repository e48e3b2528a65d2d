//! Tests for [`GeminiProvider`] against a wiremock server.

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use munin::providers::gate::ConcurrencyGate;
use munin::providers::retry::RetryConfig;
use munin::providers::{BearerToken, GeminiAuth, GeminiProvider, GenerateProvider, TokenSource};
use munin::types::{GenerateRequest, Protocol};
use munin::{GatewayError, Result};
use tokio::time::Instant;

fn fast_retry() -> RetryConfig {
    RetryConfig::new()
        .max_attempts(5)
        .initial_delay(Duration::from_millis(1))
        .jitter(false)
}

fn provider(server: &MockServer, auth: GeminiAuth) -> GeminiProvider {
    GeminiProvider::with_base_url(auth, server.uri(), ConcurrencyGate::new(2), fast_retry())
}

fn far_deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

fn success_body() -> Value {
    json!({
        "candidates": [
            {"content": {"parts": [{"text": "laparoscopic cholecystectomy"}]}}
        ],
        "usageMetadata": {
            "promptTokenCount": 12,
            "candidatesTokenCount": 4,
            "totalTokenCount": 16
        }
    })
}

#[tokio::test]
async fn generates_text_with_api_key_query_param() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-pro:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server, GeminiAuth::ApiKey("test-key".into()));
    let request = GenerateRequest::new("note text", "gemini-pro");

    let response = provider.generate(&request, far_deadline()).await.unwrap();

    assert_eq!(response.text, "laparoscopic cholecystectomy");
    assert_eq!(response.protocol, Some(Protocol::GenerateContent));
    let usage = response.usage.unwrap();
    assert_eq!(usage.input_tokens, 12);
    assert_eq!(usage.output_tokens, 4);
    assert_eq!(usage.total_tokens, 16);
}

#[tokio::test]
async fn schema_sets_json_generation_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let provider = provider(&server, GeminiAuth::ApiKey("k".into()));
    let mut request = GenerateRequest::new("note text", "gemini-pro");
    request.schema = Some(json!({"type": "object"}));
    request.temperature = Some(0.0);

    provider.generate(&request, far_deadline()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body["contents"][0]["parts"][0]["text"], "note text");
    assert_eq!(
        body["generationConfig"]["responseMimeType"],
        "application/json"
    );
    assert_eq!(body["generationConfig"]["responseSchema"]["type"], "object");
    assert_eq!(body["generationConfig"]["temperature"], 0.0);
}

#[tokio::test]
async fn retries_transient_503_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-pro:generateContent"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gemini-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let provider = provider(&server, GeminiAuth::ApiKey("k".into()));
    let request = GenerateRequest::new("note text", "gemini-pro");

    let response = provider.generate(&request, far_deadline()).await.unwrap();

    assert_eq!(response.text, "laparoscopic cholecystectomy");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn terminal_4xx_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-pro:generateContent"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": {"message": "invalid argument"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server, GeminiAuth::ApiKey("k".into()));
    let request = GenerateRequest::new("note text", "gemini-pro");

    let err = provider.generate(&request, far_deadline()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Api { status: 400, .. }));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_candidates_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let provider = provider(&server, GeminiAuth::ApiKey("k".into()));
    let request = GenerateRequest::new("note text", "gemini-pro");

    let err = provider.generate(&request, far_deadline()).await.unwrap_err();
    assert!(matches!(err, GatewayError::EmptyResponse));
}

// ============================================================================
// OAuth bearer auth
// ============================================================================

struct StaticTokenSource {
    token: &'static str,
}

#[async_trait::async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch(&self) -> Result<BearerToken> {
        Ok(BearerToken {
            token: self.token.to_string(),
            expires_at: std::time::Instant::now() + Duration::from_secs(3600),
        })
    }
}

struct FailingTokenSource;

#[async_trait::async_trait]
impl TokenSource for FailingTokenSource {
    async fn fetch(&self) -> Result<BearerToken> {
        Err(GatewayError::Configuration(
            "credential source unavailable".into(),
        ))
    }
}

#[tokio::test]
async fn oauth_sends_bearer_header_without_query_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-pro:generateContent"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let source = std::sync::Arc::new(StaticTokenSource { token: "tok-1" });
    let provider = provider(&server, GeminiAuth::OAuth(source));
    let request = GenerateRequest::new("note text", "gemini-pro");

    let response = provider.generate(&request, far_deadline()).await.unwrap();
    assert_eq!(response.text, "laparoscopic cholecystectomy");

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.query().unwrap_or("").contains("key="));
}

#[tokio::test]
async fn oauth_token_cached_across_calls() {
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource(AtomicU32);

    #[async_trait::async_trait]
    impl TokenSource for CountingSource {
        async fn fetch(&self) -> Result<BearerToken> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(BearerToken {
                token: "tok-2".to_string(),
                expires_at: std::time::Instant::now() + Duration::from_secs(3600),
            })
        }
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let source = std::sync::Arc::new(CountingSource(AtomicU32::new(0)));
    let provider = provider(&server, GeminiAuth::OAuth(source.clone()));
    let request = GenerateRequest::new("note text", "gemini-pro");

    provider.generate(&request, far_deadline()).await.unwrap();
    provider.generate(&request, far_deadline()).await.unwrap();

    assert_eq!(source.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn oauth_refresh_failure_is_fatal_before_any_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let provider = provider(
        &server,
        GeminiAuth::OAuth(std::sync::Arc::new(FailingTokenSource)),
    );
    let request = GenerateRequest::new("note text", "gemini-pro");

    let err = provider.generate(&request, far_deadline()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Configuration(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
