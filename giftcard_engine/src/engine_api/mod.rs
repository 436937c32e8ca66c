//! # Gift card engine public API
//!
//! * [`order_api`] creates orders: it validates the requested items, quotes the crypto amount, opens a payment
//!   session and persists the order.
//! * [`fulfillment_api`] is the order state machine. It consumes payment notifications, purchases the gift cards once
//!   an order is paid, and delivers the codes.
//!
//! Both APIs are created by supplying the backends they need. For example:
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url(url, 5).await?;
//! let api = FulfillmentApi::new(db, gateway, provider, notifier, Catalog::default());
//! let (outcome, result) = api.handle_notification(&body, signature).await?;
//! ```
pub mod errors;
pub mod fulfillment_api;
pub mod order_api;
pub mod order_objects;
