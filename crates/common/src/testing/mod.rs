//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: async assertions and polling helpers for
//!   background-task tests
//!
//! Macros exported with `#[macro_export]` are available at the crate root.

pub mod async_utils;

pub use async_utils::{poll_until, timeout_ok};
