//! Error taxonomy for report queries.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Errors raised while querying a single (location, day) report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The request never produced a response (connect failure, reset, TLS...).
    #[error("report request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("report API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// No response within the per-request deadline.
    #[error("report request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body is not a report document.
    #[error("malformed report response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The query itself cannot be issued.
    #[error("invalid report request: {0}")]
    InvalidRequest(String),
}

/// Coarse classification of a failed query, surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Timeout,
    Parse,
    /// The task running the query panicked or was cancelled.
    Aborted,
}

impl ReportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ReportError::Request(_)
            | ReportError::Status { .. }
            | ReportError::InvalidRequest(_) => FailureKind::Transport,
            ReportError::Timeout(_) => FailureKind::Timeout,
            ReportError::Parse(_) => FailureKind::Parse,
        }
    }

    /// Returns `true` when repeating the same request may succeed.
    ///
    /// Timeouts, connection-level failures, `429` and `5xx` statuses are
    /// transient; everything else fails the same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            ReportError::Timeout(_) => true,
            ReportError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ReportError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            ReportError::Parse(_) | ReportError::InvalidRequest(_) => false,
        }
    }
}
