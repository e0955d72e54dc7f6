//! Explicit, per-verb logging facade over an [`HttpClient`].
//!
//! Unlike [`decorate`](crate::decorate), the facade leaves the client's adapter
//! alone: only calls made through the facade are logged.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use parking_lot::RwLock;

use crate::client::{Defaults, HttpClient, Interceptors};
use crate::error::HttpError;
use crate::format::Format;
use crate::interceptor::Interceptor;
use crate::types::{Call, RequestConfig, Response};
use crate::{Logger, LoggerOptions};

/// Everything needed to build a [`LoggedClient`].
#[derive(Clone)]
pub struct LoggedClientConfig {
    /// Sink for formatted records
    pub logger: Arc<dyn Logger>,
    /// The client every verb forwards to
    pub client: HttpClient,
    /// Formatter, [`DefaultFormatter`](crate::DefaultFormatter) when unset
    pub format: Option<Arc<dyn Format>>,
}

impl LoggedClientConfig {
    pub fn new<L: Logger>(logger: L, client: HttpClient) -> Self {
        Self {
            logger: Arc::new(logger),
            client,
            format: None,
        }
    }

    pub fn with_format<F: Format>(mut self, format: F) -> Self {
        self.format = Some(Arc::new(format));
        self
    }
}

impl fmt::Debug for LoggedClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggedClientConfig")
            .field("client", &self.client)
            .field("format", &self.format.as_ref().map(|_| "custom"))
            .finish_non_exhaustive()
    }
}

/// An [`HttpClient`] facade that logs every call made through it.
///
/// Each verb forwards to the client's matching method with the same
/// arguments. [`defaults`](Self::defaults) and
/// [`interceptors`](Self::interceptors) hand out the client's own shared
/// state, so changes made through the facade are changes to the client.
///
/// # Examples
///
/// ```rust
/// use tattle::{adapter_fn, HttpClient, LoggedClient, LoggedClientConfig, RequestConfig, Response, TracingLogger};
///
/// # #[tokio::main]
/// # async fn main() {
/// let client = HttpClient::with_adapter(adapter_fn(|config| async move {
///     Ok(Response::new(http::StatusCode::OK, config))
/// }));
/// let logged = LoggedClient::new(LoggedClientConfig::new(TracingLogger, client));
///
/// let response = logged.get("/health", RequestConfig::default()).await.unwrap();
/// assert_eq!(response.status, http::StatusCode::OK);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LoggedClient {
    client: HttpClient,
    interceptor: Interceptor,
}

impl LoggedClient {
    pub fn new(config: LoggedClientConfig) -> Self {
        let options = LoggerOptions {
            format: config.format,
            logger: Some(config.logger),
        };
        Self {
            client: config.client,
            interceptor: Interceptor::new(options),
        }
    }

    /// The wrapped client.
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// The wrapped client's live defaults.
    pub fn defaults(&self) -> &Arc<RwLock<Defaults>> {
        self.client.defaults()
    }

    /// The wrapped client's live interceptor registries.
    pub fn interceptors(&self) -> &Arc<Interceptors> {
        self.client.interceptors()
    }

    /// Dispatch a call described entirely by `config`.
    pub async fn request(&self, config: RequestConfig) -> Result<Response, HttpError> {
        let call = Call::from_config(&config);
        self.interceptor
            .intercept(call, move || self.client.request(config))
            .await
    }

    pub async fn get(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        let url = url.into();
        let call = Call::new(Method::GET, url.clone(), None, config.clone());
        self.interceptor
            .intercept(call, move || self.client.get(url, config))
            .await
    }

    pub async fn delete(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        let url = url.into();
        let call = Call::new(Method::DELETE, url.clone(), None, config.clone());
        self.interceptor
            .intercept(call, move || self.client.delete(url, config))
            .await
    }

    pub async fn head(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        let url = url.into();
        let call = Call::new(Method::HEAD, url.clone(), None, config.clone());
        self.interceptor
            .intercept(call, move || self.client.head(url, config))
            .await
    }

    pub async fn options(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        let url = url.into();
        let call = Call::new(Method::OPTIONS, url.clone(), None, config.clone());
        self.interceptor
            .intercept(call, move || self.client.options(url, config))
            .await
    }

    pub async fn post(
        &self,
        url: impl Into<String>,
        data: impl Into<Option<Bytes>>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        let (url, data) = (url.into(), data.into());
        let call = Call::new(Method::POST, url.clone(), data.clone(), config.clone());
        self.interceptor
            .intercept(call, move || self.client.post(url, data, config))
            .await
    }

    pub async fn put(
        &self,
        url: impl Into<String>,
        data: impl Into<Option<Bytes>>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        let (url, data) = (url.into(), data.into());
        let call = Call::new(Method::PUT, url.clone(), data.clone(), config.clone());
        self.interceptor
            .intercept(call, move || self.client.put(url, data, config))
            .await
    }

    pub async fn patch(
        &self,
        url: impl Into<String>,
        data: impl Into<Option<Bytes>>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        let (url, data) = (url.into(), data.into());
        let call = Call::new(Method::PATCH, url.clone(), data.clone(), config.clone());
        self.interceptor
            .intercept(call, move || self.client.patch(url, data, config))
            .await
    }
}
