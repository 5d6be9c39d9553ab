//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind};

use deferq_domain::DeferqError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use toml::de::Error as TomlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DeferqError);

impl From<InfraError> for DeferqError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DeferqError> for InfraError {
    fn from(value: DeferqError) -> Self {
        InfraError(value)
    }
}

trait IntoDeferqError {
    fn into_deferq(self) -> DeferqError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → DeferqError */
/* -------------------------------------------------------------------------- */

impl IntoDeferqError for HttpError {
    fn into_deferq(self) -> DeferqError {
        if self.is_builder() {
            return DeferqError::Config(format!("invalid HTTP client settings: {self}"));
        }
        if self.is_timeout() {
            return DeferqError::Network("HTTP request timed out".into());
        }
        if self.is_connect() {
            return DeferqError::Network("HTTP connection failure".into());
        }
        if let Some(status) = self.status() {
            return DeferqError::Network(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            ));
        }
        DeferqError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_deferq())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → DeferqError */
/* -------------------------------------------------------------------------- */

impl IntoDeferqError for IoError {
    fn into_deferq(self) -> DeferqError {
        match self.kind() {
            ErrorKind::PermissionDenied => {
                DeferqError::Watchdog(format!("permission denied: {self}"))
            }
            ErrorKind::NotFound => DeferqError::Watchdog(format!("path not found: {self}")),
            _ => DeferqError::Internal(format!("I/O failure: {self}")),
        }
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_deferq())
    }
}

/* -------------------------------------------------------------------------- */
/* Config parse errors → DeferqError */
/* -------------------------------------------------------------------------- */

impl IntoDeferqError for TomlError {
    fn into_deferq(self) -> DeferqError {
        DeferqError::Config(format!("Invalid TOML format: {}", self.message()))
    }
}

impl From<TomlError> for InfraError {
    fn from(value: TomlError) -> Self {
        InfraError(value.into_deferq())
    }
}

impl IntoDeferqError for JsonError {
    fn into_deferq(self) -> DeferqError {
        DeferqError::Config(format!(
            "Invalid JSON format at line {}, column {}: {self}",
            self.line(),
            self.column()
        ))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_deferq())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
