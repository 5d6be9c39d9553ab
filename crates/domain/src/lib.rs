//! # deferq Domain
//!
//! Plain data shared by every deferq crate.
//!
//! This crate contains:
//! - Transmission outcome types (`SenderStatus`, `SendOutcome`,
//!   `SendAttempt`, `TracedRequest`, `TransportError`)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Default constants
//!
//! ## Architecture
//! - No dependencies on other deferq crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
