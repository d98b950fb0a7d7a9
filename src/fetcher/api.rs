//! Upstream API operations
//!
//! Thin typed wrappers over [`ApiHttpClient::execute`]. Every call goes through
//! the shared rate limiter and retry loop; these functions only shape request
//! bodies and decode the `data` envelope.

use chrono::SecondsFormat;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::fetcher::http::ApiHttpClient;
use crate::fetcher::pagination::{PageCursor, PaginationHelper, MAX_PAGES};
use crate::fetcher::transport::ApiRequest;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::{AccessLogRecord, ExportWindow, HostingAccount, HostingId, StorageCredentials};

/// Connectivity probe endpoint
pub const PING_PATH: &str = "/ping";
/// Hosting account listing endpoint
pub const HOSTING_PATH: &str = "/hosting";
/// Domain listing endpoint
pub const DOMAINS_PATH: &str = "/hosting/domains";
/// Storage credential endpoint
pub const STORAGE_PATH: &str = "/hosting/storage";
/// Access log query endpoint
pub const LOGS_PATH: &str = "/hosting/logs";

/// Typed access to the hosting provider's API
pub struct AccessLogApi {
    client: ApiHttpClient,
}

impl AccessLogApi {
    /// Wrap a configured client
    pub fn new(client: ApiHttpClient) -> Self {
        Self { client }
    }

    /// Underlying executor
    pub fn client(&self) -> &ApiHttpClient {
        &self.client
    }

    /// Connectivity probe; any decodable 2xx body counts as success
    pub async fn ping(&self) -> FetcherResult<()> {
        let body = self.client.execute(&ApiRequest::get(PING_PATH)).await?;
        debug!("Ping response: {}", body);
        Ok(())
    }

    /// List hosting accounts
    pub async fn list_hostings(&self) -> FetcherResult<Vec<HostingAccount>> {
        let body = self.client.execute(&ApiRequest::get(HOSTING_PATH)).await?;
        let accounts: Vec<HostingAccount> = decode(data_items(&body, HOSTING_PATH)?, HOSTING_PATH)?;
        info!("Found {} hosting accounts", accounts.len());
        Ok(accounts)
    }

    /// List domains of one hosting account
    ///
    /// Items may be plain strings or objects with a `domain` field.
    pub async fn list_domains(&self, hosting_id: &HostingId) -> FetcherResult<Vec<String>> {
        let request = ApiRequest::get_with_body(DOMAINS_PATH, json!({ "id": hosting_id }));
        let body = self.client.execute(&request).await?;

        let domains = data_items(&body, DOMAINS_PATH)?
            .into_iter()
            .map(|item| match item {
                Value::String(domain) => Ok(domain),
                Value::Object(mut map) => match map.remove("domain") {
                    Some(Value::String(domain)) => Ok(domain),
                    _ => Err(malformed(DOMAINS_PATH, "domain entry without a 'domain' string")),
                },
                other => Err(malformed(
                    DOMAINS_PATH,
                    &format!("unexpected domain entry: {other}"),
                )),
            })
            .collect::<FetcherResult<Vec<String>>>()?;

        debug!("Hosting {} has {} domains", hosting_id, domains.len());
        Ok(domains)
    }

    /// Object-storage credentials for one hosting account
    pub async fn storage_credentials(&self, hosting_id: &HostingId) -> FetcherResult<StorageCredentials> {
        let request = ApiRequest::get_with_body(STORAGE_PATH, json!({ "id": hosting_id }));
        let body = self.client.execute(&request).await?;

        let payload = match body {
            Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
            other => other,
        };

        serde_json::from_value(payload).map_err(|e| malformed(STORAGE_PATH, &e.to_string()))
    }

    /// One page of access logs for a domain
    pub async fn fetch_log_page(
        &self,
        hosting_id: &HostingId,
        domain: &str,
        window: &ExportWindow,
        cursor: PageCursor,
    ) -> FetcherResult<Vec<AccessLogRecord>> {
        let request = ApiRequest::get_with_body(
            LOGS_PATH,
            log_query_body(hosting_id, domain, window, cursor),
        );
        let body = self.client.execute(&request).await?;

        Ok(data_items(&body, LOGS_PATH)?
            .into_iter()
            .map(AccessLogRecord::new)
            .collect())
    }

    /// Every access log record of `domain` within `window`
    ///
    /// # Errors
    /// Any page failure aborts the whole fetch for this domain.
    pub async fn fetch_access_logs(
        &self,
        hosting_id: &HostingId,
        domain: &str,
        window: &ExportWindow,
        page_size: usize,
    ) -> FetcherResult<Vec<AccessLogRecord>> {
        self.fetch_access_logs_with_limit(hosting_id, domain, window, page_size, MAX_PAGES)
            .await
    }

    /// [`AccessLogApi::fetch_access_logs`] stopping with `PaginationLimit`
    /// after `max_pages` non-empty pages
    pub async fn fetch_access_logs_with_limit(
        &self,
        hosting_id: &HostingId,
        domain: &str,
        window: &ExportWindow,
        page_size: usize,
        max_pages: usize,
    ) -> FetcherResult<Vec<AccessLogRecord>> {
        let records = PaginationHelper::fetch_all_with_limit(page_size, max_pages, move |cursor| {
            self.fetch_log_page(hosting_id, domain, window, cursor)
        })
        .await?;

        info!(
            "Fetched {} access log records for {} ({})",
            records.len(),
            domain,
            window
        );
        Ok(records)
    }
}

/// Request body of the access log query
pub fn log_query_body(
    hosting_id: &HostingId,
    domain: &str,
    window: &ExportWindow,
    cursor: PageCursor,
) -> Value {
    json!({
        "id": hosting_id,
        "domain": domain,
        "size": cursor.page_size,
        "from": cursor.offset,
        "after": window.after().to_rfc3339_opts(SecondsFormat::Millis, true),
        "before": window.before().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Items of the `data` envelope; absent or null `data` means no items
fn data_items(body: &Value, path: &str) -> FetcherResult<Vec<Value>> {
    let data = match body {
        Value::Object(map) => map.get("data"),
        Value::Array(_) => Some(body),
        _ => return Err(malformed(path, "expected a JSON object")),
    };

    match data {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(malformed(
            path,
            &format!("'data' is not a list: {}", type_name(other)),
        )),
    }
}

fn decode<T: DeserializeOwned>(items: Vec<Value>, path: &str) -> FetcherResult<Vec<T>> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| malformed(path, &e.to_string())))
        .collect()
}

fn malformed(path: &str, reason: &str) -> FetcherError {
    FetcherError::MalformedResponse(format!("{path}: {reason}"))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
