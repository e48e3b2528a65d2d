//! Tests for the error taxonomy — transience classification and
//! retry-after extraction drive every retry loop.

use std::time::Duration;

use munin::GatewayError;

// ============================================================================
// Transience classification
// ============================================================================

#[test]
fn transport_errors_are_transient() {
    assert!(GatewayError::Transport("connection reset by peer".into()).is_transient());
}

#[test]
fn rate_limits_are_transient() {
    assert!(GatewayError::RateLimited { retry_after: None }.is_transient());
    assert!(
        GatewayError::RateLimited {
            retry_after: Some(Duration::from_secs(2))
        }
        .is_transient()
    );
}

#[test]
fn server_errors_are_transient() {
    assert!(GatewayError::Server { status: 500 }.is_transient());
    assert!(GatewayError::Server { status: 503 }.is_transient());
}

#[test]
fn terminal_errors_are_not_transient() {
    assert!(!GatewayError::AuthenticationFailed.is_transient());
    assert!(
        !GatewayError::Api {
            status: 422,
            message: "bad request".into()
        }
        .is_transient()
    );
    assert!(
        !GatewayError::UnsupportedParameter {
            param: "temperature".into(),
            model: "o1-mini".into()
        }
        .is_transient()
    );
    assert!(
        !GatewayError::EndpointNotFound {
            endpoint: "/v1/responses".into()
        }
        .is_transient()
    );
    assert!(!GatewayError::EmptyResponse.is_transient());
    assert!(!GatewayError::ResponseParse("truncated".into()).is_transient());
    assert!(!GatewayError::DeadlineExceeded.is_transient());
    assert!(!GatewayError::Configuration("no key".into()).is_transient());
    assert!(!GatewayError::NoProvider.is_transient());
}

// ============================================================================
// retry_after extraction
// ============================================================================

#[test]
fn retry_after_from_rate_limited() {
    let duration = Duration::from_secs(5);
    let err = GatewayError::RateLimited {
        retry_after: Some(duration),
    };
    assert_eq!(err.retry_after(), Some(duration));
}

#[test]
fn retry_after_none_when_not_specified() {
    let err = GatewayError::RateLimited { retry_after: None };
    assert_eq!(err.retry_after(), None);
}

#[test]
fn retry_after_none_for_other_errors() {
    assert_eq!(GatewayError::Transport("timeout".into()).retry_after(), None);
    assert_eq!(GatewayError::Server { status: 502 }.retry_after(), None);
}

// ============================================================================
// Display / source chain
// ============================================================================

#[test]
fn attempts_exhausted_carries_last_error() {
    let err = GatewayError::AttemptsExhausted {
        attempts: 3,
        last: Box::new(GatewayError::Server { status: 503 }),
    };
    let message = err.to_string();
    assert!(message.contains("3 attempts"));
    assert!(message.contains("503"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn messages_never_echo_payload_shape() {
    // Error text carries statuses and parameter names, not body content.
    let err = GatewayError::UnsupportedParameter {
        param: "temperature".into(),
        model: "o1".into(),
    };
    assert_eq!(
        err.to_string(),
        "unsupported parameter 'temperature' for model 'o1'"
    );
}
