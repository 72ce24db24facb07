//! Request logging middleware.
//!
//! Prints one line per inbound request to stdout before the rest of the
//! stack runs, then forwards the request untouched. Separate from the
//! tower-http trace layer, which is filter-controlled; this line is
//! unconditional.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Destination for request log lines.
pub type LogSink = Arc<dyn Fn(String) + Send + Sync>;

/// Sink writing each line to stdout.
pub fn stdout_sink() -> LogSink {
    Arc::new(|line| println!("{line}"))
}

/// Middleware stage: log `[<timestamp>] <METHOD> <PATH>` and delegate.
pub async fn log_request(
    State(sink): State<LogSink>,
    request: Request,
    next: Next,
) -> Response {
    sink(format_line(
        OffsetDateTime::now_utc(),
        request.method().as_str(),
        request.uri().path(),
    ));

    next.run(request).await
}

fn format_line(at: OffsetDateTime, method: &str, path: &str) -> String {
    // Rfc3339 formatting only fails for years outside 0..=9999.
    let timestamp = at.format(&Rfc3339).unwrap_or_default();
    format!("[{timestamp}] {method} {path}")
}
