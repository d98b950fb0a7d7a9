//! Export metrics
//!
//! Counters and histograms for request traffic, retries, limiter waits, and
//! transcoded output. Emission goes through the `metrics` facade and is a no-op
//! until [`init_metrics`] installs the Prometheus exporter.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info};

static METRICS_INITIALIZED: OnceCell<SocketAddr> = OnceCell::new();

/// Errors raised while installing the metrics exporter
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be built or bound
    #[error("failed to install Prometheus exporter on {addr}: {reason}")]
    Install {
        /// Requested listen address
        addr: SocketAddr,
        /// Underlying failure
        reason: String,
    },
}

/// Install the Prometheus scrape endpoint on `addr`.
///
/// Idempotent: later calls after a successful install are ignored. Must be called
/// from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if let Some(existing) = METRICS_INITIALIZED.get() {
        debug!(%existing, "Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install {
            addr,
            reason: e.to_string(),
        })?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Physical HTTP attempts sent to the upstream API"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Attempts repeated after a transient failure"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Responses rejected with 429 Too Many Requests"
    );
    describe_histogram!(
        "retry_backoff_seconds",
        Unit::Seconds,
        "Delay slept before each retry"
    );
    describe_histogram!(
        "rate_limit_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for a rate limiter slot"
    );
    describe_counter!(
        "log_records_transcoded_total",
        Unit::Count,
        "Access-log records converted to combined log lines"
    );
    describe_counter!(
        "log_files_written_total",
        Unit::Count,
        "Per-domain daily log files written"
    );

    let _ = METRICS_INITIALIZED.set(addr);
    info!(%addr, "Metrics endpoint listening");
    Ok(())
}

/// Count one physical request attempt with its HTTP status (0 when no response arrived)
pub fn record_request(status: u16) {
    counter!("http_requests_total", "status" => status.to_string()).increment(1);
    if status == 429 {
        counter!("http_429_errors_total").increment(1);
    }
}

/// Count one retry and the backoff that precedes it
pub fn record_retry(backoff: Duration) {
    counter!("http_retries_total").increment(1);
    histogram!("retry_backoff_seconds").record(backoff.as_secs_f64());
}

/// Record how long a caller waited on the rate limiter
pub fn record_rate_limit_wait(waited: Duration) {
    histogram!("rate_limit_wait_seconds").record(waited.as_secs_f64());
}

/// Count records converted for a domain
pub fn record_transcoded(domain: &str, records: usize) {
    counter!("log_records_transcoded_total", "domain" => domain.to_string())
        .increment(records as u64);
}

/// Count one written output file
pub fn record_file_written() {
    counter!("log_files_written_total").increment(1);
}
