use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    traits::{ExchangeRateError, GatewayError, OrderStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("Invalid items: {0}")]
    InvalidItems(String),
    #[error("Invalid buyer contact: {0}")]
    InvalidBuyerContact(String),
    #[error("Could not create a payment session: {0}")]
    PaymentGatewayError(String),
    #[error("Could not quote the order: {0}")]
    ExchangeRateError(#[from] ExchangeRateError),
    #[error("Order store error: {0}")]
    StoreError(#[from] OrderStoreError),
}

#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("The payment notification signature is missing or invalid")]
    InvalidSignature,
    #[error("The payment notification is malformed: {0}")]
    NotificationMalformed(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} is {1}, so its gift cards cannot be delivered")]
    NotCompleted(OrderId, OrderStatusType),
    #[error("Could not deliver gift cards: {0}")]
    DeliveryFailed(String),
    #[error("Order store error: {0}")]
    StoreError(#[from] OrderStoreError),
}

impl From<GatewayError> for FulfillmentError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::InvalidSignature => Self::InvalidSignature,
            GatewayError::NotificationMalformed(s) => Self::NotificationMalformed(s),
            // Verification is local, so the remaining variants only show up from a misbehaving gateway client
            other => Self::NotificationMalformed(other.to_string()),
        }
    }
}

impl FulfillmentError {
    /// True for errors caused by the content of an inbound notification, which should be answered with a client error
    pub fn is_bad_notification(&self) -> bool {
        matches!(self, Self::InvalidSignature | Self::NotificationMalformed(_))
    }
}
