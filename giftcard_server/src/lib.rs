//! # Gift card marketplace server
//! This crate hosts the HTTP server for the gift card marketplace. It is responsible for:
//! * Quoting crypto prices and creating orders, each with a hosted payment session at CoinGate.
//! * Receiving payment callbacks, and handing paid orders to the fulfillment engine.
//! * Letting operators inspect orders, re-send codes and re-drive stalled orders.
//! * Periodically resuming orders whose fulfillment was interrupted.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/crypto-rates`, `/api/orders` and `/api/orders/{order_id}`: the storefront API.
//! * `/api/webhook/payment`: the payment callback route.
//! * `/admin/...`: operator routes. These require the `X-Admin-Token` header.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod hooks;
pub mod integrations;
pub mod recovery_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
