//! Result contract of the transmission primitive.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::status::SenderStatus;

/// Diagnostic trace of a single request issued by the transport.
///
/// Only collected when the item asked for net tracing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedRequest {
    /// Local interface (bind address) the request went out on, or
    /// `"default"` when the OS routing table chose.
    pub interface: String,
    pub destination: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub http_status: Option<u16>,
    pub error: Option<String>,
}

/// Structured outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SendOutcome {
    pub status: SenderStatus,
    /// HTTP status of the last response received, if any response arrived.
    pub http_status: Option<u16>,
    pub traces: Vec<TracedRequest>,
}

impl SendOutcome {
    /// True when a response carried a 4xx or 5xx status.
    pub fn is_client_or_server_error(&self) -> bool {
        self.http_status.is_some_and(|code| (400..600).contains(&code))
    }
}

/// Transport-level failure of a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("all {attempts} attempts to {destination} failed: {last}")]
    AllInterfacesFailed { destination: String, attempts: usize, last: String },

    #[error("no usable network interface")]
    NoInterfaces,
}

/// What the transmission primitive hands back: an outcome plus an optional
/// error. Both are always present together so that a failed attempt can
/// still carry the HTTP code and traces of the requests it made.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SendAttempt {
    pub outcome: SendOutcome,
    pub error: Option<TransportError>,
}

impl SendAttempt {
    /// Clean delivery acknowledged with the given HTTP code.
    pub fn delivered(http_status: u16) -> Self {
        Self {
            outcome: SendOutcome {
                status: SenderStatus::None,
                http_status: Some(http_status),
                traces: Vec::new(),
            },
            error: None,
        }
    }

    /// Controller answered, but not with a success code.
    pub fn rejected(http_status: u16) -> Self {
        Self {
            outcome: SendOutcome {
                status: SenderStatus::from_http_status(http_status),
                http_status: Some(http_status),
                traces: Vec::new(),
            },
            error: None,
        }
    }

    /// Attempt failed before or while talking to the controller.
    pub fn failed(error: TransportError) -> Self {
        Self { outcome: SendOutcome::default(), error: Some(error) }
    }

    /// Override the reported status.
    pub fn with_status(mut self, status: SenderStatus) -> Self {
        self.outcome.status = status;
        self
    }

    /// Attach diagnostic traces.
    pub fn with_traces(mut self, traces: Vec<TracedRequest>) -> Self {
        self.outcome.traces = traces;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_or_server_error_covers_4xx_and_5xx_only() {
        let mut outcome = SendOutcome::default();
        assert!(!outcome.is_client_or_server_error());

        outcome.http_status = Some(399);
        assert!(!outcome.is_client_or_server_error());
        outcome.http_status = Some(400);
        assert!(outcome.is_client_or_server_error());
        outcome.http_status = Some(599);
        assert!(outcome.is_client_or_server_error());
        outcome.http_status = Some(600);
        assert!(!outcome.is_client_or_server_error());
    }

    #[test]
    fn rejected_maps_http_code() {
        let attempt = SendAttempt::rejected(404);
        assert_eq!(attempt.outcome.status, SenderStatus::NotFound);
        assert_eq!(attempt.outcome.http_status, Some(404));
        assert!(!attempt.is_error());
    }

    #[test]
    fn failed_keeps_status_none_until_normalized() {
        let attempt = SendAttempt::failed(TransportError::NoInterfaces);
        assert_eq!(attempt.outcome.status, SenderStatus::None);
        assert!(attempt.is_error());
        assert_eq!(attempt.error.unwrap().to_string(), "no usable network interface");
    }
}
