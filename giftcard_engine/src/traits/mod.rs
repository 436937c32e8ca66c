//! # Engine collaborator contracts
//!
//! The engine never talks to a database, a payment processor, a gift card issuer or a mail server directly. Instead,
//! it drives the following traits, and the server binds them to concrete implementations at start-up.
//!
//! * [`OrderStore`] is the durable keyed store of orders. Every state change goes through one of its atomic
//!   operations; it is the single source of truth for order status.
//! * [`PaymentGateway`] creates hosted payment sessions and authenticates inbound payment notifications.
//! * [`GiftCardProvider`] purchases a single gift card, de-duplicating retries using an idempotency key.
//! * [`GiftCardNotifier`] delivers purchased codes to the buyer.
//! * [`ExchangeRates`] supplies the USD price of each accepted crypto currency.
mod data_objects;
mod exchange_rates;
mod gift_card_provider;
mod notifier;
mod order_store;
mod payment_gateway;

pub use data_objects::{
    CardRequest,
    DeliveredCard,
    ExchangeRate,
    IdempotencyKey,
    NotificationStatus,
    OrderQueryFilter,
    OrderSummary,
    PaymentNotification,
    SessionHandle,
    SessionRequest,
};
pub use exchange_rates::{ExchangeRateError, ExchangeRates, StaticExchangeRates};
pub use gift_card_provider::{GiftCardProvider, ProviderError};
pub use notifier::{GiftCardNotifier, NotifierError};
pub use order_store::{OrderStore, OrderStoreError};
pub use payment_gateway::{GatewayError, PaymentGateway};
