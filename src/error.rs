//! Error types for the client and the logging decorator.
//!
//! [`HttpError`] is what the transport produces when a call fails. The logging
//! layers observe it and hand it back to the caller untouched. [`ConfigError`]
//! is only raised while wiring the decorator onto a client.

use std::error::Error as StdError;
use std::sync::Arc;

use serde::Serialize;

use crate::types::{RequestConfig, Response};

/// Setup failures for [`decorate`](crate::decorate).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The client has no adapter, so there is nothing to wrap.
    #[error("client has no default adapter to wrap")]
    MissingAdapter,
}

/// Broad classification of a failed call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The server answered, but the status was rejected by the status predicate.
    Status,
    /// The transport gave up waiting.
    Timeout,
    /// No usable HTTP response (connection refused, reset, DNS failure, ...).
    Network,
    /// The request could not be built (bad URL, bad header, ...).
    Request,
    /// The client has no adapter to send the request with.
    Adapter,
}

/// A failed HTTP call.
///
/// Status failures embed the [`Response`] that was rejected; every other kind
/// leaves `response` empty.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// The configuration of the call that failed, if known.
    pub config: Option<RequestConfig>,
    /// The response that was rejected, for [`ErrorKind::Status`].
    pub response: Option<Box<Response>>,
    /// Underlying cause.
    #[source]
    pub source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl HttpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            config: None,
            response: None,
            source: None,
        }
    }

    /// Build a status failure around the rejected response.
    pub fn status(response: Response) -> Self {
        let message = format!("request failed with status code {}", response.status.as_u16());
        Self {
            kind: ErrorKind::Status,
            message,
            config: Some(response.config.clone()),
            response: Some(Box::new(response)),
            source: None,
        }
    }

    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// The embedded response, if the server produced one.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }
}
