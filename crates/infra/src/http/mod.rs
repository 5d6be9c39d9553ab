//! HTTP transport

pub mod transmitter;

pub use transmitter::{HttpTransmitter, HttpTransmitterBuilder};
