//! Domain layer: value objects, entities and the pure rules that govern them.
//!
//! Nothing in here performs I/O. Storage and gateway transport are reached
//! through the traits in `ports` and `gateway`.

pub mod aggregator;
pub mod campaign;
pub mod donation;
pub mod event_log;
pub mod gateway;
pub mod lifecycle_event;
pub mod money;
pub mod ports;
pub mod state_machine;
