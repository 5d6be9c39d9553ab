//! Deferred delivery queue
//!
//! Messages that could not be delivered right away are parked here, keyed by
//! a caller-chosen identity, and retried on a backoff timer until they go
//! through, are removed, or are superseded by a newer message with the same
//! key.
//!
//! Data flow:
//!
//! 1. Producers call [`DeferredQueue::set_deferred`] and
//!    [`DeferredQueue::remove_deferred`]; both only touch the [`store`] under
//!    its lock and adjust the [`timer`].
//! 2. A timer tick wakes the [`worker`], which runs one [`dispatch`] round on
//!    the whole batch with the lock released.
//! 3. Whatever was not delivered is [`reconcile`]d with items that arrived
//!    during the round and written back.
//!
//! [`DeferredQueue::set_deferred`]: controller::DeferredQueue::set_deferred
//! [`DeferredQueue::remove_deferred`]: controller::DeferredQueue::remove_deferred

pub mod controller;
pub mod dispatch;
pub mod item;
pub mod metrics;
pub mod ports;
pub mod reconcile;
pub mod store;
pub mod timer;
mod worker;

pub use controller::{DeferredQueue, DeferredQueueBuilder};
pub use item::DeferredItem;
