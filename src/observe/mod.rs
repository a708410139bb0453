//! Request observation: latency tracking and error logging.
//!
//! The observation path piggybacks on the request lifecycle without ever
//! altering response semantics. It stamps a start time before dispatch when
//! asked to, and after the response arrives decides whether the request
//! earned a log line: a timed request always does, an erroring one does
//! when `log_errors` is set, and anything else stays silent.
//!
//! Delivery goes through the [`LogSink`] capability; formatting a line and
//! choosing its level are the only things this module owns.

pub mod sink;

pub use sink::{CapturedLine, LogContext, LogLevel, LogSink, MemorySink, TracingSink};

use crate::cache::Clock;
use crate::hooks::Hooks;
use crate::types::{HttpResponse, Outcome, Request, Timing, TransportFailure};
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::debug;

/// Level observation lines default to, before the `log_level` hook runs.
pub const DEFAULT_LOG_LEVEL: LogLevel = LogLevel::Debug;

const NO_USER_AGENT: &str = "No User Agent";

/// Pre-send stamp: converts `Timing::Requested` into `Timing::Started` so
/// the post-receive hook can compute elapsed time. A no-op otherwise.
pub(crate) fn track_request_start(request: &mut Request) {
    if request.cache.log_request_times == Timing::Requested {
        request.cache.log_request_times = Timing::Started(Instant::now());
    }
}

/// Whether `outcome` classifies as an error, after the `is_error` hook.
///
/// A completed response is an error when its status is 400 or above; a
/// transport failure always is. Both defaults fold through the hook.
pub(crate) fn classify_error(
    outcome: &Outcome,
    request: &Request,
    url: &str,
    hooks: &Hooks,
) -> bool {
    let default = match outcome {
        Outcome::Response(response) => response.status >= 400,
        Outcome::Failure(_) => true,
    };
    hooks.is_error(default, outcome, request, url)
}

/// Post-receive hook: emits at most one log line for this request.
pub(crate) async fn observe(
    outcome: &Outcome,
    request: &Request,
    url: &str,
    hooks: &Hooks,
    sink: &dyn LogSink,
    clock: &dyn Clock,
) {
    let timed = request.cache.log_request_times.is_started();
    let errored = request.cache.log_errors && classify_error(outcome, request, url, hooks);
    if !timed && !errored {
        return;
    }

    let message = format_line(outcome, request, url, clock);
    let level = hooks.log_level(DEFAULT_LOG_LEVEL, outcome, request, url);

    let mut context = LogContext::new();
    context.insert("method".into(), request.method.clone().into());
    context.insert("url".into(), url.to_string().into());
    if let Outcome::Response(response) = outcome {
        context.insert("status".into(), response.status.into());
    }

    if let Err(e) = sink.log(level, &message, &context).await {
        debug!(error = %e, "log sink rejected observation line");
    }
}

fn format_line(outcome: &Outcome, request: &Request, url: &str, clock: &dyn Clock) -> String {
    let user_agent = request.user_agent().unwrap_or(NO_USER_AGENT);

    let mut message = match outcome {
        Outcome::Response(response) => format_response_line(response, request, url, user_agent, clock),
        Outcome::Failure(failure) => format_failure_line(failure, request, url, user_agent, clock),
    };

    if let Some(ms) = request.cache.log_request_times.elapsed_ms() {
        message.push_str(&format!(" Request Latency: {ms}ms"));
    }
    message
}

fn format_response_line(
    response: &HttpResponse,
    request: &Request,
    url: &str,
    user_agent: &str,
    clock: &dyn Clock,
) -> String {
    let date = response
        .header("date")
        .map(str::to_string)
        .unwrap_or_else(|| now_stamp(clock));
    let protocol = response.protocol.as_deref().unwrap_or("1.1");

    format!(
        "[{date}] \"{method} {url} HTTP/{protocol}\" {status} \"{user_agent}\"",
        method = request.method,
        status = response.status,
    )
}

fn format_failure_line(
    failure: &TransportFailure,
    request: &Request,
    url: &str,
    user_agent: &str,
    clock: &dyn Clock,
) -> String {
    format!(
        "[{date}] \"{method} {url}\" Transport Error: \"{messages}\" \"{user_agent}\"",
        date = now_stamp(clock),
        method = request.method,
        messages = failure.joined(),
    )
}

fn now_stamp(clock: &dyn Clock) -> String {
    DateTime::<Utc>::from(clock.now())
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
