//! Apache combined log transcoder
//!
//! Stateless conversion of decoded access-log records into combined log lines:
//!
//! ```text
//! clientip ident auth [DD/Mon/YYYY:HH:MM:SS ±HHMM] "VERB PATH HTTP/VERSION" status bytes "referrer" "user-agent"
//! ```
//!
//! A record either yields a complete line or a [`TranscodeError`] naming the
//! offending field and the record's position in its batch.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::{Map, Value};

use crate::AccessLogRecord;

/// Top-level field holding the ISO-8601 instant
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Top-level object holding the access attributes
pub const ACCESS_FIELD: &str = "access";

/// Attributes every access object must carry
pub const REQUIRED_ACCESS_FIELDS: [&str; 7] = [
    "clientip",
    "ident",
    "auth",
    "verb",
    "request",
    "httpversion",
    "response",
];

const APACHE_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Placeholder for absent optional values
const EMPTY: &str = "-";

/// Record validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscodeError {
    /// Required field absent
    #[error("record {position}: missing required field '{field}'")]
    MissingField {
        /// Dotted field path
        field: String,
        /// Zero-based index of the record in its batch
        position: usize,
    },

    /// Field present but unusable
    #[error("record {position}: invalid field '{field}': {reason}")]
    InvalidField {
        /// Dotted field path
        field: String,
        /// Zero-based index of the record in its batch
        position: usize,
        /// Why the value was rejected
        reason: String,
    },
}

/// Result type for transcoding
pub type TranscodeResult<T> = Result<T, TranscodeError>;

/// Stateless converter to the combined log format
pub struct ApacheTranscoder;

impl ApacheTranscoder {
    /// Convert every record, stopping at the first invalid one
    ///
    /// # Errors
    /// The first [`TranscodeError`]; no lines are returned for the batch in that case.
    pub fn convert_batch(records: &[AccessLogRecord]) -> TranscodeResult<Vec<String>> {
        records
            .iter()
            .enumerate()
            .map(|(position, record)| Self::convert(record, position))
            .collect()
    }

    /// Convert one record into one combined log line
    ///
    /// # Arguments
    /// * `record` - Decoded access-log record
    /// * `position` - Index reported in errors
    pub fn convert(record: &AccessLogRecord, position: usize) -> TranscodeResult<String> {
        let root = record.as_value();

        let raw_timestamp = root
            .get(TIMESTAMP_FIELD)
            .filter(|v| !v.is_null())
            .ok_or_else(|| missing(TIMESTAMP_FIELD, position))?;

        let access = match root.get(ACCESS_FIELD) {
            None | Some(Value::Null) => return Err(missing(ACCESS_FIELD, position)),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(invalid(ACCESS_FIELD, position, "expected an object"));
            }
        };

        for field in REQUIRED_ACCESS_FIELDS {
            if access.get(field).map_or(true, Value::is_null) {
                return Err(missing(&access_path(field), position));
            }
        }

        let timestamp = Self::format_timestamp(raw_timestamp)
            .ok_or_else(|| invalid(TIMESTAMP_FIELD, position, "not an ISO-8601 instant"))?;

        let clientip = required_text(access, "clientip", position)?;
        let ident = required_text(access, "ident", position)?;
        let auth = required_text(access, "auth", position)?;
        let verb = required_text(access, "verb", position)?;
        let request = required_text(access, "request", position)?;
        let httpversion = required_text(access, "httpversion", position)?;

        let status = access
            .get("response")
            .and_then(parse_status)
            .ok_or_else(|| invalid(&access_path("response"), position, "not an integer"))?;

        let bytes = render_bytes(access.get("bytes"));
        let referrer = render_referrer(access.get("referrer"));
        let user_agent = render_user_agent(access.get("user_agent"));

        Ok(format!(
            "{clientip} {ident} {auth} [{timestamp}] \"{verb} {request} HTTP/{httpversion}\" {status} {bytes} \"{}\" \"{}\"",
            escape_quoted(&referrer),
            escape_quoted(&user_agent),
        ))
    }

    /// Render an ISO-8601 instant as `DD/Mon/YYYY:HH:MM:SS ±HHMM`
    ///
    /// Accepts RFC 3339 (fractional seconds, `Z` or numeric offsets) and a
    /// zone-less `YYYY-MM-DDTHH:MM:SS[.fff]`, which is read as UTC.
    pub fn format_timestamp(value: &Value) -> Option<String> {
        let parsed = parse_instant(value.as_str()?)?;
        Some(parsed.format(APACHE_TIME_FORMAT).to_string())
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

fn access_path(field: &str) -> String {
    format!("{ACCESS_FIELD}.{field}")
}

fn missing(field: &str, position: usize) -> TranscodeError {
    TranscodeError::MissingField {
        field: field.to_string(),
        position,
    }
}

fn invalid(field: &str, position: usize, reason: &str) -> TranscodeError {
    TranscodeError::InvalidField {
        field: field.to_string(),
        position,
        reason: reason.to_string(),
    }
}

/// Strings as-is, numbers and booleans in their JSON spelling
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required_text(access: &Map<String, Value>, field: &str, position: usize) -> TranscodeResult<String> {
    access
        .get(field)
        .and_then(scalar_text)
        .ok_or_else(|| invalid(&access_path(field), position, "expected a string or number"))
}

/// Integer, float truncated toward zero, or an integer string
fn parse_status(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                let f = n.as_f64()?;
                let truncated = f.trunc();
                if truncated.is_finite() && truncated.abs() < i64::MAX as f64 {
                    Some(truncated as i64)
                } else {
                    None
                }
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn render_bytes(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        (f as i64).to_string()
                    }
                    _ => EMPTY.to_string(),
                }
            }
        }
        Some(Value::String(s)) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.clone()
        }
        _ => EMPTY.to_string(),
    }
}

fn render_referrer(value: Option<&Value>) -> String {
    let raw = match value.and_then(scalar_text) {
        Some(raw) => raw,
        None => return EMPTY.to_string(),
    };

    let stripped = strip_outer_quotes(&raw);
    if stripped.is_empty() {
        EMPTY.to_string()
    } else {
        stripped.to_string()
    }
}

/// Remove exactly one surrounding pair of literal double quotes
fn strip_outer_quotes(raw: &str) -> &str {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

fn render_user_agent(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Object(ua)) => resolve_structured_user_agent(ua),
        _ => EMPTY.to_string(),
    }
}

fn resolve_structured_user_agent(ua: &Map<String, Value>) -> String {
    let component = |key: &str| {
        ua.get(key)
            .and_then(scalar_text)
            .filter(|text| !text.is_empty())
    };

    if let Some(name) = component("name") {
        if let Some(version) = component("version") {
            return format!("{name}/{version}");
        }

        let numbered: Vec<String> = ["major", "minor", "patch"]
            .into_iter()
            .filter_map(component)
            .collect();

        return if numbered.is_empty() {
            name
        } else {
            format!("{name}/{}", numbered.join("."))
        };
    }

    component("os_full")
        .or_else(|| component("os_name"))
        .unwrap_or_else(|| EMPTY.to_string())
}

/// Escape backslashes and double quotes in one pass over the input
fn escape_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            other => escaped.push(other),
        }
    }
    escaped
}
