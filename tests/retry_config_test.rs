//! Tests for [`RetryConfig`] — the pure deadline/backoff policy.

use std::time::Duration;

use munin::providers::retry::RetryConfig;
use tokio::time::Instant;

fn config() -> RetryConfig {
    RetryConfig::new()
        .max_attempts(5)
        .initial_delay(Duration::from_millis(100))
        .max_delay(Duration::from_secs(2))
        .jitter(false)
}

#[test]
fn backoff_doubles_per_attempt() {
    let config = config();
    assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
    assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
    assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
}

#[test]
fn backoff_caps_at_max_delay() {
    let config = config();
    assert_eq!(config.delay_for_attempt(10), Duration::from_secs(2));
}

#[test]
fn jitter_stays_within_one_base_delay() {
    let config = RetryConfig::new()
        .initial_delay(Duration::from_millis(100))
        .max_delay(Duration::from_secs(60))
        .jitter(true);
    for _ in 0..100 {
        let delay = config.delay_for_attempt(1);
        assert!(delay >= Duration::from_millis(200));
        assert!(delay < Duration::from_millis(300));
    }
}

#[tokio::test]
async fn retry_after_takes_precedence() {
    let config = config();
    let deadline = Instant::now() + Duration::from_secs(30);
    let delay = config
        .next_delay(0, Some(Duration::from_secs(7)), deadline)
        .unwrap();
    assert_eq!(delay, Duration::from_secs(7));
}

#[tokio::test]
async fn delay_clamped_to_remaining_budget() {
    let config = config();
    let deadline = Instant::now() + Duration::from_millis(50);
    let delay = config
        .next_delay(3, Some(Duration::from_secs(60)), deadline)
        .unwrap();
    assert!(delay <= Duration::from_millis(50));
}

#[tokio::test]
async fn stops_when_attempts_exhausted() {
    let config = config();
    let deadline = Instant::now() + Duration::from_secs(30);
    // Attempt index 4 would be the fifth send; no sixth is permitted.
    assert!(config.next_delay(4, None, deadline).is_none());
    assert!(config.next_delay(3, None, deadline).is_some());
}

#[tokio::test]
async fn stops_when_no_budget_remains() {
    let config = config();
    let deadline = Instant::now(); // already passed
    assert!(config.next_delay(0, None, deadline).is_none());
}

#[test]
fn disabled_config_permits_single_attempt() {
    let config = RetryConfig::disabled();
    assert_eq!(config.max_attempts, 1);
}

#[test]
fn defaults() {
    let config = RetryConfig::default();
    assert_eq!(config.max_attempts, 4);
    assert_eq!(config.initial_delay, Duration::from_millis(500));
    assert_eq!(config.max_delay, Duration::from_secs(30));
    assert!(config.jitter);
}
