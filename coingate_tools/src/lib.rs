//! Client for the CoinGate crypto payment API.
//!
//! * [`CoinGateApi`] creates payment orders (the buyer-facing checkout sessions).
//! * [`verify_callback_signature`] authenticates the payment callbacks CoinGate sends to the server.
//! * [`CallbackPayload`] parses those callbacks, which arrive either as JSON or as a url-encoded form.
mod api;
mod config;
mod data_objects;
mod error;
mod signature;

pub use api::CoinGateApi;
pub use config::CoinGateConfig;
pub use data_objects::{CallbackPayload, CoinGateOrder, CoinGateStatus, CreateOrderRequest};
pub use error::CoinGateApiError;
pub use signature::{sign_callback, verify_callback_signature, SIGNATURE_HEADER};
