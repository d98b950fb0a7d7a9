//! Integration tests for the reqwest transport and API operations
//!
//! A wiremock server stands in for the hosting API.

use access_log_exporter::downloader::config::RetryPolicy;
use access_log_exporter::downloader::RateLimiter;
use access_log_exporter::fetcher::transport::{API_KEY_HEADER, API_USER_HEADER};
use access_log_exporter::fetcher::{
    AccessLogApi, ApiHttpClient, ApiRequest, FetcherError, HttpTransport, ReqwestTransport,
};
use access_log_exporter::{ExportWindow, HostingId};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";
const USER: &str = "test-user";

fn transport_for(server: &MockServer) -> ReqwestTransport {
    ReqwestTransport::new(Client::new(), server.uri(), KEY, USER)
}

fn api_for(server: &MockServer, max_retries: u32) -> AccessLogApi {
    AccessLogApi::new(ApiHttpClient::new(
        Arc::new(transport_for(server)),
        Arc::new(RateLimiter::default()),
        RetryPolicy::with_max_retries(max_retries),
    ))
}

#[tokio::test]
async fn test_sends_credential_headers_and_get_body() {
    let server = MockServer::start().await;
    let body = json!({"id": 7, "domain": "example.com", "size": 100, "from": 0});

    Mock::given(method("GET"))
        .and(path("/hosting/logs"))
        .and(header(API_KEY_HEADER, KEY))
        .and(header(API_USER_HEADER, USER))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport_for(&server)
        .send(&ApiRequest::get_with_body("/hosting/logs", body))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.retry_after, None);
}

#[tokio::test]
async fn test_retry_after_header_extracted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .mount(&server)
        .await;

    let response = transport_for(&server)
        .send(&ApiRequest::get("/ping"))
        .await
        .unwrap();

    assert_eq!(response.status, 429);
    assert_eq!(response.retry_after, Some(Duration::from_secs(2)));
}

#[tokio::test]
async fn test_oversized_retry_after_is_ignored() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1e300"))
        .mount(&server)
        .await;

    let response = transport_for(&server)
        .send(&ApiRequest::get("/ping"))
        .await
        .unwrap();

    assert_eq!(response.status, 429);
    assert_eq!(response.retry_after, None);
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let transport = ReqwestTransport::new(Client::new(), format!("http://127.0.0.1:{port}"), KEY, USER);

    let result = transport.send(&ApiRequest::get("/ping")).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_list_hostings_decodes_accounts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hosting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 1, "username": "alice"},
                {"id": "h-2", "username": "bob", "plan": "pro"}
            ]
        })))
        .mount(&server)
        .await;

    let accounts = api_for(&server, 0).list_hostings().await.unwrap();

    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].id, HostingId::Number(1));
    assert_eq!(accounts[1].id, HostingId::Text("h-2".into()));
    assert_eq!(accounts[1].username, "bob");
}

#[tokio::test]
async fn test_list_domains_accepts_both_shapes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hosting/domains"))
        .and(body_json(json!({"id": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": ["a.example.com", {"domain": "b.example.com", "ssl": true}]
        })))
        .mount(&server)
        .await;

    let domains = api_for(&server, 0)
        .list_domains(&HostingId::Number(1))
        .await
        .unwrap();

    assert_eq!(domains, vec!["a.example.com", "b.example.com"]);
}

#[tokio::test]
async fn test_storage_credentials_wrapped_or_bare() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hosting/storage"))
        .and(body_json(json!({"id": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"accessKey": "AK1", "secretKey": "SK1", "name": "bucket-1"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hosting/storage"))
        .and(body_json(json!({"id": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessKey": "AK2", "secretKey": "SK2", "name": "bucket-2"
        })))
        .mount(&server)
        .await;

    let api = api_for(&server, 0);

    let wrapped = api.storage_credentials(&HostingId::Number(1)).await.unwrap();
    assert_eq!(wrapped.access_key, "AK1");
    assert_eq!(wrapped.bucket, "bucket-1");

    let bare = api.storage_credentials(&HostingId::Number(2)).await.unwrap();
    assert_eq!(bare.secret_key, "SK2");
}

#[tokio::test]
async fn test_null_data_ends_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hosting/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .expect(1)
        .mount(&server)
        .await;

    let window = ExportWindow::parse("2025-10-23", "2025-10-23").unwrap();
    let records = api_for(&server, 0)
        .fetch_access_logs(&HostingId::Number(1), "example.com", &window, 100)
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_client_error_surfaces_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hosting"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = api_for(&server, 3).list_hostings().await.unwrap_err();

    assert_eq!(
        err,
        FetcherError::ClientRequest {
            status: 401,
            message: "invalid api key".into()
        }
    );
}

#[tokio::test]
async fn test_server_error_retried_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    api_for(&server, 1).ping().await.unwrap();
}
