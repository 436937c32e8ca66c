//! Client for the Tango Card rewards API, used to buy digital gift cards.
//!
//! Every order is placed with an `externalRefID`. Tango refuses a second order with the same reference, and
//! [`TangoApi::place_order`] answers that refusal by looking up the original order, so that retrying a purchase never
//! buys a second card.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::TangoApi;
pub use config::TangoConfig;
pub use data_objects::{CardCredentials, Credential, OrderRequest, Recipient, Reward, RewardOrder};
pub use error::TangoApiError;
