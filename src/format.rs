//! Turning a finished call into loggable values.
//!
//! The [`Format`] trait is the extension point; [`DefaultFormatter`] produces
//!
//! ```text
//! [METHOD, "<status>/(<statusText>)", "<elapsed>ms", url, {config, data, response, error}]
//! ```

use bytes::Bytes;
use http::HeaderMap;
use serde_json::{json, Map, Value};

use crate::error::HttpError;
use crate::types::{LogValue, RequestConfig, RequestRecord, Response};

/// Rendered in place of a status or status text when no response exists.
pub const MISSING: &str = "-";

/// Converts a finished call into the positional values passed to a
/// [`Logger`](crate::Logger).
///
/// Implementations must be pure and must not panic; a panic is contained by
/// the interceptor but the call then goes unlogged.
///
/// Any `Fn(&RequestRecord) -> Vec<LogValue>` closure is a formatter:
///
/// ```rust
/// use tattle::{LoggerOptions, LogValue, RequestRecord};
///
/// let options = LoggerOptions::default().with_format(|record: &RequestRecord<'_>| {
///     vec![LogValue::from(format!("{} {}", record.method, record.url))]
/// });
/// ```
pub trait Format: Send + Sync + 'static {
    fn format(&self, record: &RequestRecord<'_>) -> Vec<LogValue>;
}

impl<F> Format for F
where
    F: Fn(&RequestRecord<'_>) -> Vec<LogValue> + Send + Sync + 'static,
{
    fn format(&self, record: &RequestRecord<'_>) -> Vec<LogValue> {
        self(record)
    }
}

/// The formatter used when none is configured. See [`format_default`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFormatter;

impl Format for DefaultFormatter {
    fn format(&self, record: &RequestRecord<'_>) -> Vec<LogValue> {
        format_default(record)
    }
}

/// Default layout: uppercased method, status summary, elapsed milliseconds,
/// URL, then a JSON context object with the config, payload, response and error.
///
/// Status and status text come from the response, or from the response
/// embedded in the error; without either they render as [`MISSING`].
pub fn format_default(record: &RequestRecord<'_>) -> Vec<LogValue> {
    let status = record
        .response()
        .or_else(|| record.error().and_then(HttpError::response));
    let (code, text) = match status {
        Some(response) => (
            response.status.as_u16().to_string(),
            response.status_text.clone(),
        ),
        None => (MISSING.to_string(), MISSING.to_string()),
    };

    let context = json!({
        "config": config_json(record.config),
        "data": record.data.map(body_json).unwrap_or(Value::Null),
        "response": record.response().map(response_json).unwrap_or(Value::Null),
        "error": record.error().map(error_json).unwrap_or(Value::Null),
    });

    vec![
        LogValue::Text(record.method.as_str().to_uppercase()),
        LogValue::Text(format!("{code}/({text})")),
        LogValue::Text(format!("{}ms", record.elapsed().as_millis())),
        LogValue::Text(record.url.to_string()),
        LogValue::Context(context),
    ]
}

fn headers_json(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match map.get_mut(name.as_str()) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                map.insert(name.as_str().to_string(), Value::String(value));
            }
        }
    }
    Value::Object(map)
}

fn body_json(body: &Bytes) -> Value {
    Value::String(String::from_utf8_lossy(body).into_owned())
}

fn config_json(config: &RequestConfig) -> Value {
    json!({
        "method": config.method.as_str(),
        "url": config.url,
        "headers": headers_json(&config.headers),
        "params": config.params,
        "timeout_ms": config.timeout.map(|t| t.as_millis() as u64),
    })
}

fn response_json(response: &Response) -> Value {
    json!({
        "status": response.status.as_u16(),
        "status_text": response.status_text,
        "headers": headers_json(&response.headers),
        "data": body_json(&response.data),
    })
}

fn error_json(error: &HttpError) -> Value {
    json!({
        "kind": error.kind,
        "message": error.message,
        "response": error.response().map(response_json).unwrap_or(Value::Null),
    })
}
