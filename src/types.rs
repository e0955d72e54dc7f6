//! Data types for outbound calls and the per-call request record.
//!
//! [`RequestConfig`] and [`Response`] are what flows through the client and its
//! adapter. [`Call`] and [`RequestRecord`] exist only for the logging path: a
//! `Call` is captured before the real operation starts, and a `RequestRecord`
//! is assembled once it has finished.

use std::fmt;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::error::HttpError;

/// Decides whether a status code counts as success.
pub type ValidateStatus = fn(StatusCode) -> bool;

/// The status predicate used when neither the call nor the client sets one.
pub fn default_validate_status(status: StatusCode) -> bool {
    status.is_success()
}

fn canonical_method(method: Method) -> Method {
    const STANDARD: [Method; 9] = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::HEAD,
        Method::OPTIONS,
        Method::CONNECT,
        Method::PATCH,
        Method::TRACE,
    ];
    STANDARD
        .into_iter()
        .find(|standard| standard.as_str().eq_ignore_ascii_case(method.as_str()))
        .unwrap_or(method)
}

/// Configuration of a single call.
///
/// Fields left empty are filled from the client's [`Defaults`](crate::Defaults)
/// when the call is dispatched.
#[derive(Clone, Debug, Default)]
pub struct RequestConfig {
    /// HTTP method (GET unless set)
    pub method: Method,
    /// Target URL, absolute or relative to the client's base URL
    pub url: String,
    /// Request payload
    pub data: Option<Bytes>,
    /// Request headers
    pub headers: HeaderMap,
    /// Query string parameters, in order
    pub params: Vec<(String, String)>,
    /// Per-request timeout, enforced by the transport
    pub timeout: Option<Duration>,
    /// Status predicate, see [`default_validate_status`]
    pub validate_status: Option<ValidateStatus>,
}

impl RequestConfig {
    /// A config for `method` on `url`.
    ///
    /// Pass canonical methods (`Method::GET`, not `Method::from_bytes(b"get")`).
    /// HTTP methods are case-sensitive, so a lowercase spelling of a standard
    /// method is folded to its canonical form here and in
    /// [`with_method`](Self::with_method). Genuine extension methods are kept
    /// as given.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method: canonical_method(method),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = canonical_method(method);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_data(mut self, data: impl Into<Option<Bytes>>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_validate_status(mut self, validate: ValidateStatus) -> Self {
        self.validate_status = Some(validate);
        self
    }
}

/// A response produced by an adapter.
#[derive(Clone, Debug)]
pub struct Response {
    /// HTTP status code
    pub status: StatusCode,
    /// Reason phrase reported for the status
    pub status_text: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub data: Bytes,
    /// The configuration of the call that produced this response
    pub config: RequestConfig,
}

impl Response {
    /// An empty-bodied response with the canonical reason phrase for `status`.
    pub fn new(status: StatusCode, config: RequestConfig) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            data: Bytes::new(),
            config,
        }
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }
}

/// Identity of a call, captured before the real operation runs.
#[derive(Clone, Debug)]
pub struct Call {
    pub method: Method,
    pub url: String,
    pub data: Option<Bytes>,
    pub config: RequestConfig,
}

impl Call {
    pub fn new(
        method: Method,
        url: impl Into<String>,
        data: Option<Bytes>,
        config: RequestConfig,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            data,
            config,
        }
    }

    /// Derive method, URL and payload from the configuration itself.
    pub fn from_config(config: &RequestConfig) -> Self {
        Self {
            method: config.method.clone(),
            url: config.url.clone(),
            data: config.data.clone(),
            config: config.clone(),
        }
    }
}

/// How a finished call ended.
#[derive(Clone, Copy, Debug)]
pub enum Outcome<'a> {
    Success(&'a Response),
    Failure(&'a HttpError),
}

/// Everything known about one finished call.
///
/// Records are built by the [`Interceptor`](crate::Interceptor) after the real
/// operation returns and are handed to the formatter by reference; they never
/// outlive the call.
#[derive(Clone, Copy, Debug)]
pub struct RequestRecord<'a> {
    pub method: &'a Method,
    pub url: &'a str,
    pub data: Option<&'a Bytes>,
    pub config: &'a RequestConfig,
    pub outcome: Outcome<'a>,
    /// Wall-clock time just before the real operation started
    pub start_time: SystemTime,
    /// Wall-clock time just after it finished
    pub end_time: SystemTime,
}

impl<'a> RequestRecord<'a> {
    pub fn response(&self) -> Option<&'a Response> {
        match self.outcome {
            Outcome::Success(response) => Some(response),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&'a HttpError> {
        match self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// `end_time - start_time`, never negative.
    pub fn elapsed(&self) -> Duration {
        self.end_time
            .duration_since(self.start_time)
            .unwrap_or_default()
    }
}

/// One positional value handed to a [`Logger`](crate::Logger).
#[derive(Clone, Debug, PartialEq)]
pub enum LogValue {
    Text(String),
    Context(serde_json::Value),
}

impl LogValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            LogValue::Text(text) => Some(text),
            LogValue::Context(_) => None,
        }
    }
}

impl From<String> for LogValue {
    fn from(text: String) -> Self {
        LogValue::Text(text)
    }
}

impl From<&str> for LogValue {
    fn from(text: &str) -> Self {
        LogValue::Text(text.to_string())
    }
}

impl From<serde_json::Value> for LogValue {
    fn from(value: serde_json::Value) -> Self {
        LogValue::Context(value)
    }
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Text(text) => f.write_str(text),
            LogValue::Context(value) => write!(f, "{value}"),
        }
    }
}
