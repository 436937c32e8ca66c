use std::time::Duration;

use gcm_common::Cents;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderId, OrderStatusType, PaymentMethod},
    helpers::RetryPolicy,
    traits::SessionHandle,
};

pub const MAX_ITEMS_PER_ORDER: usize = 20;
pub const DEFAULT_MAX_CONCURRENT_PURCHASES: usize = 4;
pub const DEFAULT_RESUME_AFTER: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub brand: String,
    pub denomination: Cents,
}

impl ItemRequest {
    pub fn new<S: Into<String>>(brand: S, denomination: Cents) -> Self {
        Self { brand: brand.into(), denomination }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub items: Vec<ItemRequest>,
    pub payment_method: PaymentMethod,
    pub buyer_contact: String,
}

/// A persisted order, plus the payment details the buyer needs to pay for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order: Order,
    pub session: SessionHandle,
}

/// What happened in response to an authenticated payment notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// The order moved from `pending` to `paid`. Fulfillment should follow.
    Paid(OrderId),
    /// The payment was rejected and the order moved from `pending` to `failed`
    Rejected(OrderId),
    /// The notification did not change anything: a duplicate, a stale or out-of-order status, or an intermediate one
    Ignored { order_id: OrderId, status: OrderStatusType, reason: String },
    /// No order carries this correlation id
    UnknownOrder(String),
}

impl NotificationOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::Paid(id) => format!("Payment for order {id} confirmed"),
            Self::Rejected(id) => format!("Payment for order {id} rejected"),
            Self::Ignored { order_id, status, reason } => format!("Order {order_id} is {status}. {reason}"),
            Self::UnknownOrder(id) => format!("No order matches payment session {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentResult {
    /// Every line item holds a gift card. `delivered` reports whether the buyer received the codes.
    Completed { delivered: bool },
    /// At least one line item could not be fulfilled. The indices of those items are listed.
    Failed { failed_items: Vec<usize> },
    /// This call did not fulfil the order, because it was not in a state to be fulfilled (e.g. another caller got to
    /// it first). The status observed is returned.
    NotStarted(OrderStatusType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentOptions {
    /// Upper bound on concurrent purchase requests within one order
    pub max_concurrent_purchases: usize,
    /// Timeout and retry policy for each gift card purchase
    pub purchase_retry: RetryPolicy,
    /// Timeout and retry policy for delivering codes to the buyer
    pub delivery_retry: RetryPolicy,
    /// A `processing` order is only resumed once it has gone this long without an update. A more recent order may
    /// still have a fulfillment run in flight.
    pub resume_after: Duration,
}

impl Default for FulfillmentOptions {
    fn default() -> Self {
        Self {
            max_concurrent_purchases: DEFAULT_MAX_CONCURRENT_PURCHASES,
            purchase_retry: RetryPolicy::default(),
            delivery_retry: RetryPolicy::default(),
            resume_after: DEFAULT_RESUME_AFTER,
        }
    }
}
