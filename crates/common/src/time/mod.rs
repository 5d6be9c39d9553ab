//! Time utilities
//!
//! - **[`backoff`]**: exponential delay sequence with jitter, and uniform
//!   range draws
//! - **[`ticker`]**: a tick source whose cadence can be switched between a
//!   random range and an exponential backoff while it runs, plus an
//!   immediate one-shot kick
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use deferq_common::time::ExponentialBackoff;
//!
//! let backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(8), 0.0);
//! assert_eq!(backoff.delay(0), Duration::from_secs(1));
//! assert_eq!(backoff.delay(3), Duration::from_secs(8));
//! assert_eq!(backoff.delay(10), Duration::from_secs(8));
//! ```

pub mod backoff;
pub mod ticker;

pub use backoff::{random_between, ExponentialBackoff};
pub use ticker::{FlexTicker, Regime, TickerError};
