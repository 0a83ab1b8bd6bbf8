//! Event system for the recorder
//!
//! This crate provides the event bus and event types used to report
//! pipeline progress back to the capture front-end.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
