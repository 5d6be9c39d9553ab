//! # deferq Core
//!
//! The deferred delivery queue: business logic only.
//!
//! This crate contains:
//! - The item store, merge reconciler and dispatch round
//! - The backoff timer wiring and the background loop
//! - Port interfaces (traits) for transmission and liveness reporting
//!
//! ## Architecture Principles
//! - Only depends on `deferq-domain` and `deferq-common`
//! - No HTTP or filesystem code
//! - All external collaborators via traits

pub mod deferred;

pub use deferred::controller::{DeferredQueue, DeferredQueueBuilder};
pub use deferred::item::DeferredItem;
pub use deferred::metrics::{DeferredMetrics, DeferredMetricsSnapshot};
pub use deferred::ports::{LivenessRegistrar, PriorityCheck, SendRequest, SentHandler, Transmitter};
pub use deferred::timer::TimerSettings;
pub use deferq_common::Regime;
