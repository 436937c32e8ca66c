//! Order lifecycle events
//!
//! The fulfillment orchestrator publishes an event whenever an order is paid, completed or fails. Other parts of the
//! system (alerting, analytics, the server's logging hooks) subscribe by registering handlers in [`EventHooks`].
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
