//! Error types used throughout deferq

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for deferq
///
/// Item-level delivery failures never surface as this type; they are carried
/// inside [`crate::SendAttempt`] and resolved into a disposition by the
/// dispatch round. `DeferqError` covers construction, configuration and
/// adapter failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DeferqError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Watchdog error: {0}")]
    Watchdog(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for deferq operations
pub type Result<T> = std::result::Result<T, DeferqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_prefix() {
        let err = DeferqError::Config("backoff_min exceeds backoff_max".into());
        assert_eq!(err.to_string(), "Configuration error: backoff_min exceeds backoff_max");
    }

    #[test]
    fn serializes_with_tagged_layout() {
        let err = DeferqError::Watchdog("touch failed".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "Watchdog");
        assert_eq!(json["message"], "touch failed");
    }
}
