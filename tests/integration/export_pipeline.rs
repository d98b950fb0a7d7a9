//! Integration tests for the full export sequence

use access_log_exporter::downloader::{DownloadError, ExportExecutor, ExportScope};
use access_log_exporter::fetcher::{ApiRequest, FetcherError, RawResponse};
use access_log_exporter::{ExportWindow, HostingId};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use crate::support::scripted_transport::{api_with, ScriptedTransport};

fn log_record(ip: &str, path: &str) -> Value {
    json!({
        "@timestamp": "2025-10-22T08:15:00.000Z",
        "access": {
            "clientip": ip,
            "ident": "-",
            "auth": "-",
            "verb": "GET",
            "request": path,
            "httpversion": "1.1",
            "response": 200,
            "bytes": 100,
            "referrer": "\"https://ref.example/\"",
            "user_agent": {"name": "Chrome", "version": "120.0"}
        }
    })
}

fn json_response(body: Value) -> Result<RawResponse, access_log_exporter::fetcher::transport::TransportError> {
    Ok(RawResponse::new(200, body.to_string()))
}

/// Provider with two accounts: account 1 has a.com (one good day) and b.com
/// (one bad record); account 2 cannot list its domains.
fn provider() -> Arc<ScriptedTransport> {
    ScriptedTransport::routed(|request: &ApiRequest| {
        let body = request.body.clone().unwrap_or(Value::Null);
        match request.path.as_str() {
            "/ping" => json_response(json!({"pong": true})),
            "/hosting" => json_response(json!({
                "data": [{"id": 1, "username": "alice"}, {"id": 2, "username": "bob"}]
            })),
            "/hosting/domains" if body["id"] == 1 => {
                json_response(json!({"data": ["a.com", {"domain": "b.com"}]}))
            }
            "/hosting/domains" => Ok(RawResponse::new(500, "backend down")),
            "/hosting/logs" => {
                let first_page = body["from"] == 0;
                let first_day = body["after"] == "2025-10-22T00:00:00.000Z";
                let data = match (body["domain"].as_str(), first_page && first_day) {
                    (Some("a.com"), true) => json!([
                        log_record("10.0.0.1", "/index.html"),
                        log_record("10.0.0.2", "/about")
                    ]),
                    (Some("b.com"), true) => json!([{"@timestamp": "2025-10-22T09:00:00Z"}]),
                    _ => Value::Null,
                };
                json_response(json!({ "data": data }))
            }
            other => Ok(RawResponse::new(404, format!("no route {other}"))),
        }
    })
}

fn two_day_window() -> ExportWindow {
    ExportWindow::parse("2025-10-22", "2025-10-23").unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_export_writes_files_and_reports_failures() {
    let dir = TempDir::new().unwrap();
    let transport = provider();
    let executor = ExportExecutor::new(api_with(transport.clone()), dir.path());

    let summary = executor
        .execute(&ExportScope::new(two_day_window()))
        .await
        .unwrap();

    assert_eq!(summary.jobs_total, 4);
    assert_eq!(summary.files_written, 1);
    assert_eq!(summary.empty_slices, 2);
    assert_eq!(summary.lines_written, 2);
    assert!(!summary.is_success());

    let targets: Vec<&str> = summary.failures.iter().map(|f| f.target.as_str()).collect();
    assert_eq!(targets, vec!["hosting 2", "b.com 2025-10-22"]);
    assert!(summary.failures[1].reason.contains("access"));

    let written = dir.path().join("a.com").join("a.com-2025-10-22.log");
    let content = std::fs::read_to_string(&written).unwrap();
    assert_eq!(
        content,
        concat!(
            "10.0.0.1 - - [22/Oct/2025:08:15:00 +0000] \"GET /index.html HTTP/1.1\" 200 100 \"https://ref.example/\" \"Chrome/120.0\"\n",
            "10.0.0.2 - - [22/Oct/2025:08:15:00 +0000] \"GET /about HTTP/1.1\" 200 100 \"https://ref.example/\" \"Chrome/120.0\"\n",
        )
    );

    // Empty days and rejected batches leave no file behind
    assert!(!dir.path().join("a.com").join("a.com-2025-10-23.log").exists());
    assert!(!dir.path().join("b.com").exists());
}

#[tokio::test(start_paused = true)]
async fn test_domain_filter_limits_requests() {
    let dir = TempDir::new().unwrap();
    let transport = provider();
    let executor = ExportExecutor::new(api_with(transport.clone()), dir.path());

    let scope = ExportScope::new(two_day_window())
        .with_hosting_id(Some(HostingId::Number(1)))
        .with_domain(Some("a.com".to_string()));
    let summary = executor.execute(&scope).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.jobs_total, 2);
    assert_eq!(summary.files_written, 1);

    let log_bodies = transport.bodies_for("/hosting/logs");
    assert!(log_bodies.iter().all(|b| b["domain"] == "a.com"));
    // Account 2 is never asked for its domains
    assert!(transport
        .bodies_for("/hosting/domains")
        .iter()
        .all(|b| b["id"] == 1));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_hosting_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let executor = ExportExecutor::new(api_with(provider()), dir.path());

    let scope = ExportScope::new(two_day_window()).with_hosting_id(Some(HostingId::Number(99)));
    let err = executor.execute(&scope).await.unwrap_err();

    assert!(matches!(err, DownloadError::Configuration(msg) if msg.contains("99")));
}

#[tokio::test(start_paused = true)]
async fn test_failed_account_lookup_halts_run() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::routed(|request: &ApiRequest| match request.path.as_str() {
        "/ping" => json_response(json!({})),
        _ => Ok(RawResponse::new(200, "not json")),
    });
    let executor = ExportExecutor::new(api_with(transport.clone()), dir.path());

    let err = executor
        .execute(&ExportScope::new(two_day_window()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DownloadError::Fetcher(FetcherError::MalformedResponse(_))
    ));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_halts_before_any_listing() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::always(RawResponse::new(403, "bad credentials"));
    let executor = ExportExecutor::new(api_with(transport.clone()), dir.path());

    let err = executor
        .execute(&ExportScope::new(two_day_window()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DownloadError::Fetcher(FetcherError::ClientRequest { status: 403, .. })
    ));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_page_size_rejected() {
    let dir = TempDir::new().unwrap();
    let transport = provider();
    let executor = ExportExecutor::new(api_with(transport.clone()), dir.path()).with_page_size(0);

    let err = executor
        .execute(&ExportScope::new(two_day_window()))
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Configuration(_)));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_page_ceiling_fails_only_that_slice() {
    let dir = TempDir::new().unwrap();
    let executor = ExportExecutor::new(api_with(provider()), dir.path()).with_max_pages(1);

    let scope = ExportScope::new(two_day_window())
        .with_hosting_id(Some(HostingId::Number(1)))
        .with_domain(Some("a.com".to_string()));
    let summary = executor.execute(&scope).await.unwrap();

    // Day 22 has a non-empty first page and hits the ceiling; day 23 is empty
    assert_eq!(summary.jobs_total, 2);
    assert_eq!(summary.files_written, 0);
    assert_eq!(summary.empty_slices, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].target, "a.com 2025-10-22");
    assert!(!dir.path().join("a.com").join("a.com-2025-10-22.log").exists());
}

#[tokio::test(start_paused = true)]
async fn test_zero_page_ceiling_rejected() {
    let dir = TempDir::new().unwrap();
    let transport = provider();
    let executor = ExportExecutor::new(api_with(transport.clone()), dir.path()).with_max_pages(0);

    let err = executor
        .execute(&ExportScope::new(two_day_window()))
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Configuration(_)));
    assert_eq!(transport.call_count(), 0);
}
