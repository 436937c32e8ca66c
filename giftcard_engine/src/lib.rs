//! Gift Card Engine
//!
//! The engine takes a buyer's gift card selection from "payment requested" to "codes delivered". It coordinates two
//! external, unreliable services (a crypto payment processor and a gift card issuer) and guarantees that a paid order
//! is fulfilled at most once, and that failures leave the order in a recoverable, visible state.
//!
//! The library is divided into these sections:
//! 1. Order storage ([`mod@db`]). SQLite is the durable backend, and an in-memory store is provided for tests. Order
//!    status only ever changes through the atomic operations of the [`OrderStore`] trait.
//! 2. Collaborator contracts ([`mod@traits`]). The payment gateway, gift card provider, notifier and exchange rate
//!    source are traits; the server binds them to real HTTP clients.
//! 3. The public API ([`mod@engine_api`]). [`OrderApi`] creates orders and [`FulfillmentApi`] is the fulfillment state
//!    machine.
//!
//! The engine also publishes events when orders are paid, completed or fail. See [`mod@events`].
pub mod catalog;
pub mod db;
pub mod db_types;
pub mod engine_api;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use db::memory::InMemoryOrderStore;
#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use engine_api::{
    errors::{FulfillmentError, OrderApiError},
    fulfillment_api::FulfillmentApi,
    order_api::OrderApi,
    order_objects,
};
pub use traits::{GiftCardNotifier, GiftCardProvider, OrderStore, PaymentGateway};
