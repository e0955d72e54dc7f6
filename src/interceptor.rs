//! The timing and branching logic shared by every integration.
//!
//! [`Interceptor::intercept`] runs a real-call operation, records how long it
//! took and how it ended, and reports that through the configured formatter
//! and logger. The caller always gets the operation's own result back.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use tracing::{debug, warn};

use crate::error::HttpError;
use crate::format::{DefaultFormatter, Format};
use crate::logging_handler::TracingLogger;
use crate::types::{Call, Outcome, RequestRecord, Response};
use crate::{Logger, LoggerOptions};

/// Wraps calls with logging.
///
/// Cloning is cheap; clones share the formatter and logger. The interceptor
/// keeps no per-call state of its own, so one instance can serve any number of
/// concurrent calls.
#[derive(Clone)]
pub struct Interceptor {
    format: Arc<dyn Format>,
    logger: Arc<dyn Logger>,
}

impl Interceptor {
    pub fn new(options: LoggerOptions) -> Self {
        Self {
            format: options.format.unwrap_or_else(|| Arc::new(DefaultFormatter)),
            logger: options.logger.unwrap_or_else(|| Arc::new(TracingLogger)),
        }
    }

    /// Run `operation`, log its outcome once, and return its result unchanged.
    ///
    /// Success is logged through [`Logger::info`], failure through
    /// [`Logger::error`]. A panicking formatter or logger is contained and
    /// reported with `tracing::warn!`. If the returned future is dropped before
    /// `operation` completes nothing is logged.
    pub async fn intercept<F, Fut>(&self, call: Call, operation: F) -> Result<Response, HttpError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Response, HttpError>>,
    {
        let in_flight = InFlight::begin(self, &call);
        let result = operation().await;
        in_flight.finish(&result);
        result
    }

    fn emit(&self, record: &RequestRecord<'_>) {
        let logged = panic::catch_unwind(AssertUnwindSafe(|| {
            let values = self.format.format(record);
            if record.is_success() {
                self.logger.info(&values);
            } else {
                self.logger.error(&values);
            }
        }));

        if let Err(payload) = logged {
            warn!(
                method = %record.method,
                url = %record.url,
                reason = panic_message(&*payload),
                "request logging failed; outcome passed through unchanged"
            );
        }
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor").finish_non_exhaustive()
    }
}

/// Finalization guard for one call.
///
/// `finish` is the single place a record is built and logged. Dropping the
/// guard without finishing means the call was abandoned.
struct InFlight<'a> {
    interceptor: &'a Interceptor,
    call: &'a Call,
    start_time: SystemTime,
    started: Instant,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn begin(interceptor: &'a Interceptor, call: &'a Call) -> Self {
        Self {
            interceptor,
            call,
            start_time: SystemTime::now(),
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(mut self, result: &Result<Response, HttpError>) {
        self.finished = true;
        // Derived from the monotonic clock so the record can never go backwards.
        let end_time = self.start_time + self.started.elapsed();
        let outcome = match result {
            Ok(response) => Outcome::Success(response),
            Err(error) => Outcome::Failure(error),
        };
        let record = RequestRecord {
            method: &self.call.method,
            url: &self.call.url,
            data: self.call.data.as_ref(),
            config: &self.call.config,
            outcome,
            start_time: self.start_time,
            end_time,
        };
        self.interceptor.emit(&record);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                method = %self.call.method,
                url = %self.call.url,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "call dropped before completion; not logged"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
