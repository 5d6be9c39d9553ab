//! Domain types for the deferred delivery queue

pub mod outcome;
pub mod status;

pub use outcome::{SendAttempt, SendOutcome, TracedRequest, TransportError};
pub use status::SenderStatus;
