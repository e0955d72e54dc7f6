//! A small HTTP client with swappable adapter and interceptor registries.
//!
//! The client does not talk to the network itself. It merges its
//! [`Defaults`] into each call, runs the registered interceptors, and hands the
//! resolved [`RequestConfig`] to whatever [`Adapter`] is installed. Swapping
//! that adapter is how [`decorate`](crate::decorate) adds logging to every call.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method};
use parking_lot::RwLock;
use tower::util::BoxCloneSyncService;
use tower::ServiceExt;
use tracing::debug;

use crate::error::{ErrorKind, HttpError};
use crate::types::{default_validate_status, RequestConfig, Response, ValidateStatus};

/// The transport function: takes a resolved config, yields a response or error.
pub type Adapter = BoxCloneSyncService<RequestConfig, Response, HttpError>;

/// Build an [`Adapter`] from an async closure.
///
/// ```rust
/// use tattle::{adapter_fn, settle, Response};
///
/// let adapter = adapter_fn(|config| async move {
///     settle(Response::new(http::StatusCode::OK, config).with_data("pong"))
/// });
/// ```
pub fn adapter_fn<F, Fut>(f: F) -> Adapter
where
    F: Fn(RequestConfig) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
{
    Adapter::new(tower::service_fn(f))
}

/// Resolve a response against its config's status predicate.
///
/// Adapters call this last: accepted statuses pass through, anything else
/// becomes an [`ErrorKind::Status`] error that embeds the response.
pub fn settle(response: Response) -> Result<Response, HttpError> {
    let validate = response
        .config
        .validate_status
        .unwrap_or(default_validate_status);
    if validate(response.status) {
        Ok(response)
    } else {
        Err(HttpError::status(response))
    }
}

/// Client-wide settings applied to every call.
#[derive(Clone, Default)]
pub struct Defaults {
    /// Prefix for relative URLs
    pub base_url: Option<String>,
    /// Headers added to calls that do not set them
    pub headers: HeaderMap,
    /// Timeout for calls that do not set one
    pub timeout: Option<Duration>,
    /// Status predicate for calls that do not set one
    pub validate_status: Option<ValidateStatus>,
    /// The transport function
    pub adapter: Option<Adapter>,
}

impl Defaults {
    /// Fill the gaps in `config` from these defaults.
    pub fn merge(&self, mut config: RequestConfig) -> RequestConfig {
        if let Some(base_url) = &self.base_url {
            if !is_absolute_url(&config.url) {
                config.url = combine_urls(base_url, &config.url);
            }
        }
        for name in self.headers.keys() {
            if config.headers.contains_key(name) {
                continue;
            }
            for value in self.headers.get_all(name) {
                config.headers.append(name.clone(), value.clone());
            }
        }
        config.timeout = config.timeout.or(self.timeout);
        config.validate_status = config.validate_status.or(self.validate_status);
        config
    }
}

impl fmt::Debug for Defaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defaults")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("has_adapter", &self.adapter.is_some())
            .finish()
    }
}

fn is_absolute_url(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => url.starts_with("//"),
    }
}

fn combine_urls(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// Handle returned when registering an interceptor, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

/// Rewrites a config before it reaches the adapter.
pub type RequestInterceptor =
    dyn Fn(RequestConfig) -> Result<RequestConfig, HttpError> + Send + Sync;

/// Observes or rewrites the adapter's result.
pub type ResponseInterceptor =
    dyn Fn(Result<Response, HttpError>) -> Result<Response, HttpError> + Send + Sync;

/// An ordered registry of interceptors.
///
/// Registration and removal go through `&self`, so a registry shared between
/// a client and a [`LoggedClient`](crate::LoggedClient) is mutated in place.
pub struct InterceptorManager<H: ?Sized> {
    handlers: RwLock<Vec<(InterceptorId, Arc<H>)>>,
    next_id: AtomicUsize,
}

impl<H: ?Sized> InterceptorManager<H> {
    fn push(&self, handler: Arc<H>) -> InterceptorId {
        let id = InterceptorId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, handler));
        id
    }

    fn snapshot(&self) -> Vec<Arc<H>> {
        self.handlers
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect()
    }

    /// Remove a handler. Returns false if it was already gone.
    pub fn eject(&self, id: InterceptorId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl InterceptorManager<RequestInterceptor> {
    pub fn add<F>(&self, handler: F) -> InterceptorId
    where
        F: Fn(RequestConfig) -> Result<RequestConfig, HttpError> + Send + Sync + 'static,
    {
        self.push(Arc::new(handler))
    }

    /// Most recently added runs first.
    fn apply(&self, mut config: RequestConfig) -> Result<RequestConfig, HttpError> {
        for handler in self.snapshot().into_iter().rev() {
            config = handler(config)?;
        }
        Ok(config)
    }
}

impl InterceptorManager<ResponseInterceptor> {
    pub fn add<F>(&self, handler: F) -> InterceptorId
    where
        F: Fn(Result<Response, HttpError>) -> Result<Response, HttpError> + Send + Sync + 'static,
    {
        self.push(Arc::new(handler))
    }

    fn apply(&self, mut result: Result<Response, HttpError>) -> Result<Response, HttpError> {
        for handler in self.snapshot() {
            result = handler(result);
        }
        result
    }
}

impl<H: ?Sized> Default for InterceptorManager<H> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl<H: ?Sized> fmt::Debug for InterceptorManager<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorManager")
            .field("len", &self.len())
            .finish()
    }
}

/// Request and response interceptor registries of a client.
///
/// Request interceptors run last-added first; response interceptors run in
/// the order they were added.
#[derive(Debug, Default)]
pub struct Interceptors {
    pub request: InterceptorManager<RequestInterceptor>,
    pub response: InterceptorManager<ResponseInterceptor>,
}

/// HTTP client with shared, live defaults and interceptors.
///
/// Clones share state: changing the defaults or adapter through one clone is
/// visible through all of them.
#[derive(Clone, Debug, Default)]
pub struct HttpClient {
    defaults: Arc<RwLock<Defaults>>,
    interceptors: Arc<Interceptors>,
}

impl HttpClient {
    /// A client without an adapter. Calls fail until one is installed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapter(adapter: Adapter) -> Self {
        Self::from_defaults(Defaults {
            adapter: Some(adapter),
            ..Defaults::default()
        })
    }

    pub fn from_defaults(defaults: Defaults) -> Self {
        Self {
            defaults: Arc::new(RwLock::new(defaults)),
            interceptors: Arc::default(),
        }
    }

    pub fn defaults(&self) -> &Arc<RwLock<Defaults>> {
        &self.defaults
    }

    pub fn interceptors(&self) -> &Arc<Interceptors> {
        &self.interceptors
    }

    /// Dispatch a call described entirely by `config`.
    pub async fn request(&self, config: RequestConfig) -> Result<Response, HttpError> {
        let (adapter, config) = {
            let defaults = self.defaults.read();
            let config = defaults.merge(config);
            match defaults.adapter.clone() {
                Some(adapter) => (adapter, config),
                None => {
                    return Err(HttpError::new(ErrorKind::Adapter, "client has no adapter")
                        .with_config(config))
                }
            }
        };

        let config = self.interceptors.request.apply(config)?;
        debug!(method = %config.method, url = %config.url, "dispatching request");
        let result = adapter.oneshot(config).await;
        self.interceptors.response.apply(result)
    }

    pub async fn get(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.request(config.with_method(Method::GET).with_url(url).with_data(None))
            .await
    }

    pub async fn delete(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.request(config.with_method(Method::DELETE).with_url(url).with_data(None))
            .await
    }

    pub async fn head(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.request(config.with_method(Method::HEAD).with_url(url).with_data(None))
            .await
    }

    pub async fn options(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.request(config.with_method(Method::OPTIONS).with_url(url).with_data(None))
            .await
    }

    pub async fn post(
        &self,
        url: impl Into<String>,
        data: impl Into<Option<Bytes>>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.request(config.with_method(Method::POST).with_url(url).with_data(data))
            .await
    }

    pub async fn put(
        &self,
        url: impl Into<String>,
        data: impl Into<Option<Bytes>>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.request(config.with_method(Method::PUT).with_url(url).with_data(data))
            .await
    }

    pub async fn patch(
        &self,
        url: impl Into<String>,
        data: impl Into<Option<Bytes>>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.request(config.with_method(Method::PATCH).with_url(url).with_data(data))
            .await
    }
}
