//! Runtime utilities shared across deferq crates.
//!
//! - [`time`]: backoff delay calculation and the reschedulable
//!   [`FlexTicker`](time::FlexTicker) that drives deferred delivery rounds
//! - [`testing`]: async assertions for tests (enabled under `cfg(test)` or
//!   the `test-utils` feature)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use time::{ExponentialBackoff, FlexTicker, Regime, TickerError};
