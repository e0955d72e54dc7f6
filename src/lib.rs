//! # Tattle
//!
//! A logging decorator for outbound HTTP calls. Every call made through a
//! decorated client is timed and reported, success or failure, without
//! changing what the caller gets back.
//!
//! ## Features
//!
//! - **Transparent**: [`decorate`] swaps the client's adapter for a logging one,
//!   so every existing call site and interceptor keeps working unchanged
//! - **Explicit**: [`LoggedClient`] wraps a client in a facade with one logged
//!   method per HTTP verb, leaving the client itself untouched
//! - **Extensible**: plug in your own [`Format`] and [`Logger`]
//! - **Pass-through**: responses and errors reach the caller exactly as the
//!   transport produced them, even when logging itself fails
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tattle::{decorate, reqwest_adapter, HttpClient, LoggerOptions, RequestConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::with_adapter(reqwest_adapter(reqwest::Client::new()));
//! client.defaults().write().base_url = Some("https://api.example.com".to_string());
//!
//! // Every call through `client` is now logged via `tracing`.
//! decorate(&client, LoggerOptions::default())?;
//!
//! let response = client.get("/users", RequestConfig::default()).await?;
//! println!("{}", response.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Loggers
//!
//! Implement the [`Logger`] trait to send the formatted values anywhere:
//!
//! ```rust
//! use tattle::{LogValue, Logger};
//!
//! #[derive(Debug)]
//! struct StderrLogger;
//!
//! impl Logger for StderrLogger {
//!     fn info(&self, values: &[LogValue]) {
//!         eprintln!("{}", values.iter().map(ToString::to_string).collect::<Vec<_>>().join(" "));
//!     }
//!
//!     fn error(&self, values: &[LogValue]) {
//!         eprintln!("ERROR {}", values.iter().map(ToString::to_string).collect::<Vec<_>>().join(" "));
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::{Layer, Service};
use tracing::{debug, instrument};

pub mod client;
pub mod error;
pub mod facade;
pub mod format;
pub mod interceptor;
pub mod logging_handler;
#[cfg(feature = "reqwest")]
pub mod transport;
pub mod types;

pub use client::{
    adapter_fn, settle, Adapter, Defaults, HttpClient, InterceptorId, InterceptorManager,
    Interceptors, RequestInterceptor, ResponseInterceptor,
};
pub use error::{ConfigError, ErrorKind, HttpError};
pub use facade::{LoggedClient, LoggedClientConfig};
pub use format::{format_default, DefaultFormatter, Format};
pub use interceptor::Interceptor;
pub use logging_handler::TracingLogger;
#[cfg(feature = "reqwest")]
pub use transport::reqwest_adapter;
pub use types::{
    default_validate_status, Call, LogValue, Outcome, RequestConfig, RequestRecord, Response,
    ValidateStatus,
};

/// Destination for formatted call records.
///
/// Both methods receive the formatter's output in order. Calls complete
/// concurrently, so implementations must cope with being invoked from many
/// tasks at once.
///
/// # Examples
///
/// ```rust
/// use std::sync::Mutex;
/// use tattle::{LogValue, Logger};
///
/// #[derive(Debug, Default)]
/// struct Collecting {
///     lines: Mutex<Vec<String>>,
/// }
///
/// impl Logger for Collecting {
///     fn info(&self, values: &[LogValue]) {
///         self.lines.lock().unwrap().push(format!("{values:?}"));
///     }
///
///     fn error(&self, values: &[LogValue]) {
///         self.lines.lock().unwrap().push(format!("error: {values:?}"));
///     }
/// }
/// ```
pub trait Logger: Send + Sync + 'static {
    /// Called once for each call that produced a response.
    fn info(&self, values: &[LogValue]);
    /// Called once for each call that failed.
    fn error(&self, values: &[LogValue]);
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn info(&self, values: &[LogValue]) {
        (**self).info(values)
    }

    fn error(&self, values: &[LogValue]) {
        (**self).error(values)
    }
}

/// Options for the logging decorator.
///
/// Unset fields fall back to [`DefaultFormatter`] and [`TracingLogger`].
///
/// # Examples
///
/// ```rust
/// use tattle::{LoggerOptions, TracingLogger};
///
/// // Default formatter, default logger
/// let options = LoggerOptions::default();
///
/// // Explicit logger
/// let options = LoggerOptions::default().with_logger(TracingLogger);
/// ```
#[derive(Clone, Default)]
pub struct LoggerOptions {
    /// Formatter for call records
    pub format: Option<Arc<dyn Format>>,
    /// Sink for formatted records
    pub logger: Option<Arc<dyn Logger>>,
}

impl LoggerOptions {
    pub fn with_format<F: Format>(mut self, format: F) -> Self {
        self.format = Some(Arc::new(format));
        self
    }

    pub fn with_logger<L: Logger>(mut self, logger: L) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }
}

impl fmt::Debug for LoggerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerOptions")
            .field("format", &self.format.as_ref().map(|_| "custom"))
            .field("logger", &self.logger.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Decorate `client` so that every call it makes is logged.
///
/// The client's current adapter is wrapped in a [`CallLoggerLayer`] and put
/// back in its place; the same client is returned so calls can be chained.
/// All clones of the client observe the change.
///
/// Decorating twice stacks the wrappers and logs every call twice.
///
/// # Errors
///
/// [`ConfigError::MissingAdapter`] if the client has no adapter yet.
///
/// # Examples
///
/// ```rust
/// use tattle::{adapter_fn, decorate, HttpClient, LoggerOptions, Response};
///
/// let client = HttpClient::with_adapter(adapter_fn(|config| async move {
///     Ok(Response::new(http::StatusCode::OK, config))
/// }));
/// let client = decorate(&client, LoggerOptions::default()).unwrap();
/// ```
pub fn decorate(client: &HttpClient, options: LoggerOptions) -> Result<&HttpClient, ConfigError> {
    let layer = CallLoggerLayer::new(options);
    let mut defaults = client.defaults().write();
    let adapter = defaults.adapter.take().ok_or(ConfigError::MissingAdapter)?;
    defaults.adapter = Some(Adapter::new(layer.layer(adapter)));
    debug!("client adapter wrapped with call logger");
    Ok(client)
}

/// Tower layer that logs every call passing through an adapter.
///
/// [`decorate`] applies it to a client in place. It can also be used directly
/// when composing an adapter:
///
/// ```rust
/// use tattle::{adapter_fn, Adapter, CallLoggerLayer, LoggerOptions, Response};
/// use tower::ServiceBuilder;
///
/// let adapter = Adapter::new(
///     ServiceBuilder::new()
///         .layer(CallLoggerLayer::new(LoggerOptions::default()))
///         .service(adapter_fn(|config| async move {
///             Ok(Response::new(http::StatusCode::OK, config))
///         })),
/// );
/// ```
#[derive(Clone, Debug)]
pub struct CallLoggerLayer {
    interceptor: Interceptor,
}

impl CallLoggerLayer {
    pub fn new(options: LoggerOptions) -> Self {
        Self {
            interceptor: Interceptor::new(options),
        }
    }
}

impl<S> Layer<S> for CallLoggerLayer {
    type Service = CallLoggerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CallLoggerService {
            inner,
            interceptor: self.interceptor.clone(),
        }
    }
}

/// Adapter wrapper produced by [`CallLoggerLayer`].
///
/// Accepts and returns exactly what the inner adapter does.
#[derive(Clone, Debug)]
pub struct CallLoggerService<S> {
    inner: S,
    interceptor: Interceptor,
}

impl<S> Service<RequestConfig> for CallLoggerService<S>
where
    S: Service<RequestConfig, Response = Response, Error = HttpError>,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = HttpError;
    type Future = BoxFuture<'static, Result<Response, HttpError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    #[instrument(skip_all)]
    fn call(&mut self, config: RequestConfig) -> Self::Future {
        let call = Call::from_config(&config);
        debug!(method = %call.method, url = %call.url, "dispatching through call logger");

        let future = self.inner.call(config);
        let interceptor = self.interceptor.clone();
        Box::pin(async move { interceptor.intercept(call, move || future).await })
    }
}
