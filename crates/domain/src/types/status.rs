//! Sender status codes reported by the transmission primitive.

use serde::{Deserialize, Serialize};

use crate::impl_status_conversions;

/// Result classification of one send attempt.
///
/// The dispatch engine only distinguishes `None` (no problem) from anything
/// else. The remaining variants exist so transports and completion handlers
/// can report and react to specific controller answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderStatus {
    /// No problem
    #[default]
    None,
    /// Controller refused the connection
    Refused,
    /// Controller is being upgraded
    Upgrade,
    /// Controller certificate is invalid
    CertInvalid,
    /// Controller certificate is missing
    CertMiss,
    /// Signature verification failed
    SignVerifyFail,
    /// Unsupported hash or signature algorithm
    AlgoFail,
    /// Hash size mismatch in the signed envelope
    HashSizeError,
    /// Certificate signed by an unknown authority
    CertUnknownAuthority,
    /// Certificate signed by an unknown authority, seen through a proxy
    CertUnknownAuthorityProxy,
    /// Controller answered 404
    NotFound,
    /// Controller answered 403
    Forbidden,
    /// Generic failure
    Failed,
    /// Informational status used for "still queued" reports
    Debug,
}

impl_status_conversions!(SenderStatus {
    None => "none",
    Refused => "refused",
    Upgrade => "upgrade",
    CertInvalid => "cert_invalid",
    CertMiss => "cert_miss",
    SignVerifyFail => "sign_verify_fail",
    AlgoFail => "algo_fail",
    HashSizeError => "hash_size_error",
    CertUnknownAuthority => "cert_unknown_authority",
    CertUnknownAuthorityProxy => "cert_unknown_authority_proxy",
    NotFound => "not_found",
    Forbidden => "forbidden",
    Failed => "failed",
    Debug => "debug",
});

impl SenderStatus {
    /// True for the "no problem" status.
    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// Map an HTTP response code onto a sender status.
    ///
    /// 2xx is `None`; 403, 404 and 503 have dedicated statuses; any other
    /// code is `Failed`.
    pub fn from_http_status(code: u16) -> Self {
        match code {
            200..=299 => Self::None,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            503 => Self::Upgrade,
            _ => Self::Failed,
        }
    }
}
