//! Default [`Logger`] backed by `tracing`.
//!
//! [`TracingLogger`] writes one event per call, joining the formatter's values
//! with spaces the way a console logger would print them.

use tracing::{error, info};

use crate::{LogValue, Logger};

/// Target used for every event emitted by [`TracingLogger`].
pub const TARGET: &str = "tattle";

/// Logs call records as `tracing` events.
///
/// Successful calls are emitted at `INFO`, failed ones at `ERROR`, both under
/// the [`TARGET`] target. Install a subscriber to see them.
///
/// # Examples
///
/// ```rust,no_run
/// use tattle::{decorate, reqwest_adapter, HttpClient, LoggerOptions, TracingLogger};
///
/// tracing_subscriber::fmt().with_env_filter("tattle=info").init();
///
/// let client = HttpClient::with_adapter(reqwest_adapter(reqwest::Client::new()));
/// decorate(&client, LoggerOptions::default().with_logger(TracingLogger)).unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, values: &[LogValue]) {
        info!(target: TARGET, "{}", join(values));
    }

    fn error(&self, values: &[LogValue]) {
        error!(target: TARGET, "{}", join(values));
    }
}

fn join(values: &[LogValue]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
