//! [`Adapter`] that sends calls over the network with `reqwest`.

use bytes::Bytes;
use tracing::debug;

use crate::client::{adapter_fn, settle, Adapter};
use crate::error::{ErrorKind, HttpError};
use crate::types::{RequestConfig, Response};

/// An adapter that performs each call with `client`.
///
/// The config's method, URL, headers, query parameters, payload and timeout
/// are forwarded as-is; the full response body is read before the response is
/// settled against the config's status predicate. Connection failures and
/// timeouts produce errors without an embedded response.
pub fn reqwest_adapter(client: reqwest::Client) -> Adapter {
    adapter_fn(move |config: RequestConfig| {
        let client = client.clone();
        async move { send(&client, config).await }
    })
}

async fn send(client: &reqwest::Client, config: RequestConfig) -> Result<Response, HttpError> {
    let url = reqwest::Url::parse(&config.url).map_err(|e| {
        HttpError::new(ErrorKind::Request, format!("invalid url {:?}: {e}", config.url))
            .with_config(config.clone())
            .with_source(e)
    })?;

    let mut builder = client
        .request(config.method.clone(), url)
        .headers(config.headers.clone());
    if !config.params.is_empty() {
        builder = builder.query(&config.params);
    }
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(data) = &config.data {
        builder = builder.body(data.clone());
    }

    let response = builder
        .send()
        .await
        .map_err(|e| from_reqwest(e, &config))?;

    let status = response.status();
    let headers = response.headers().clone();
    debug!(status = %status, url = %config.url, "response headers received");
    let data: Bytes = response
        .bytes()
        .await
        .map_err(|e| from_reqwest(e, &config))?;

    settle(Response {
        status,
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        data,
        config,
    })
}

fn from_reqwest(error: reqwest::Error, config: &RequestConfig) -> HttpError {
    let kind = if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_builder() {
        ErrorKind::Request
    } else {
        ErrorKind::Network
    };
    HttpError::new(kind, error.to_string())
        .with_config(config.clone())
        .with_source(error)
}
