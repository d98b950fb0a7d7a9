//! Integration tests for HTTP retry behavior
//!
//! Runs the retrying executor against a scripted transport on paused time, so
//! backoff and Retry-After waits are observable without real sleeps.

use access_log_exporter::downloader::config::RetryPolicy;
use access_log_exporter::downloader::RateLimiter;
use access_log_exporter::fetcher::transport::TransportError;
use access_log_exporter::fetcher::{ApiRequest, FetcherError, RawResponse};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::support::scripted_transport::{client_with, client_with_limiter, ok_json, ScriptedTransport};

fn ping() -> ApiRequest {
    ApiRequest::get("/ping")
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_hint_is_honoured() {
    let transport = ScriptedTransport::sequence(vec![
        Ok(RawResponse::new(429, "slow down").with_retry_after(Duration::from_secs(2))),
        ok_json(json!({"ok": true})),
    ]);
    let client = client_with(transport.clone(), RetryPolicy::default());

    let start = Instant::now();
    let body = client.execute(&ping()).await.unwrap();

    assert_eq!(body, json!({"ok": true}));
    assert_eq!(transport.call_count(), 2);
    assert!(start.elapsed() >= Duration::from_secs(2));

    let calls = transport.calls();
    assert!(calls[1].at.duration_since(calls[0].at) >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_client_error_is_not_retried() {
    let transport = ScriptedTransport::always(RawResponse::new(400, "bad request"));
    let client = client_with(transport.clone(), RetryPolicy::default());

    let err = client.execute(&ping()).await.unwrap_err();

    assert_eq!(
        err,
        FetcherError::ClientRequest {
            status: 400,
            message: "bad request".into()
        }
    );
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_custom_max_retries_bounds_attempts() {
    let transport = ScriptedTransport::always(RawResponse::new(503, "maintenance"));
    let client = client_with(transport.clone(), RetryPolicy::with_max_retries(2));
    assert_eq!(client.max_retries(), 2);

    let err = client.execute(&ping()).await.unwrap_err();

    assert_eq!(transport.call_count(), 3);
    assert_eq!(err.status(), Some(503));
    assert!(matches!(err, FetcherError::UpstreamUnavailable { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_default_max_retries_bounds_attempts() {
    let transport = ScriptedTransport::always(RawResponse::new(429, ""));
    let client = client_with(transport.clone(), RetryPolicy::default());

    let err = client.execute(&ping()).await.unwrap_err();

    assert_eq!(transport.call_count(), 6);
    assert_eq!(err, FetcherError::RateLimited { retry_after: None });
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_between_attempts() {
    let transport = ScriptedTransport::sequence(vec![
        Err(TransportError("connection reset".into())),
        Ok(RawResponse::new(500, "oops")),
        Err(TransportError("connection reset".into())),
        ok_json(json!({"data": []})),
    ]);
    let client = client_with(transport.clone(), RetryPolicy::default());

    client.execute(&ping()).await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 4);

    let gaps: Vec<Duration> = calls
        .windows(2)
        .map(|pair| pair[1].at.duration_since(pair[0].at))
        .collect();

    // 1s, 2s, 4s plus at most 100ms of jitter each
    for (gap, base_secs) in gaps.iter().zip([1u64, 2, 4]) {
        let base = Duration::from_secs(base_secs);
        assert!(*gap >= base, "gap {gap:?} < {base:?}");
        assert!(*gap <= base + Duration::from_millis(100), "gap {gap:?} too long");
    }
}

#[tokio::test(start_paused = true)]
async fn test_malformed_body_is_fatal() {
    let transport = ScriptedTransport::always(RawResponse::new(200, "<html>maintenance</html>"));
    let client = client_with(transport.clone(), RetryPolicy::default());

    let err = client.execute(&ping()).await.unwrap_err();

    assert!(matches!(err, FetcherError::MalformedResponse(_)));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retries_consume_rate_limit_slots() {
    let window = Duration::from_secs(60);
    let limiter = Arc::new(RateLimiter::request_based(2, window, 0));
    let transport = ScriptedTransport::sequence(vec![
        Ok(RawResponse::new(502, "")),
        Ok(RawResponse::new(502, "")),
        ok_json(json!({"ok": true})),
    ]);
    let client = client_with_limiter(transport.clone(), limiter.clone(), RetryPolicy::default());

    let start = Instant::now();
    client.execute(&ping()).await.unwrap();

    // Third attempt has to wait for the first slot to leave the window
    assert_eq!(transport.call_count(), 3);
    let calls = transport.calls();
    assert!(calls[2].at.duration_since(calls[0].at) >= window);
    assert!(start.elapsed() >= window);
}
