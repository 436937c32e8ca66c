use std::fmt::Display;

use chrono::{DateTime, Utc};
use gcm_common::Cents;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderId, OrderStatusType, PaymentMethod},
};

//--------------------------------------    Payment sessions   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub order_id: OrderId,
    /// The order total, in USD
    pub price: Cents,
    pub receive_currency: PaymentMethod,
    /// The amount of crypto quoted to the buyer
    pub crypto_amount: Decimal,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    /// The gateway's correlation id for this session
    pub id: String,
    pub pay_url: String,
    pub receive_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    /// Payment has been received in full
    Confirmed,
    /// The payment was invalid, expired or was cancelled
    Rejected,
    /// Any intermediate or unrelated status. The raw status is kept for logging.
    Ignorable(String),
}

impl Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed => f.write_str("confirmed"),
            Self::Rejected => f.write_str("rejected"),
            Self::Ignorable(s) => write!(f, "ignorable ({s})"),
        }
    }
}

/// An authenticated payment status notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    pub correlation_id: String,
    pub status: NotificationStatus,
}

//--------------------------------------   Card purchases      ---------------------------------------------------------
/// Deterministic token identifying one line item purchase. Retries of the same purchase always carry the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(order_id: &OrderId, index: usize, brand: &str, denomination: Cents) -> Self {
        let brand = brand.trim().to_ascii_lowercase().replace(|c: char| !c.is_ascii_alphanumeric(), "-");
        Self(format!("{order_id}:{index}:{brand}:{}", denomination.value()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRequest {
    pub order_id: OrderId,
    pub line_item_index: usize,
    pub brand: String,
    pub denomination: Cents,
    pub idempotency_key: IdempotencyKey,
    pub recipient: String,
}

//--------------------------------------   Code delivery       ---------------------------------------------------------
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredCard {
    pub brand: String,
    pub denomination: Cents,
    pub code: String,
    pub pin: Option<String>,
    pub redemption_url: Option<String>,
}

impl std::fmt::Debug for DeliveredCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveredCard")
            .field("brand", &self.brand)
            .field("denomination", &self.denomination)
            .field("code", &"****")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub total: Cents,
    pub cards: Vec<DeliveredCard>,
}

//--------------------------------------    Exchange rates     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub currency: PaymentMethod,
    /// How many US dollars one unit of the currency is worth
    pub usd_per_unit: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(currency: PaymentMethod, usd_per_unit: Decimal) -> Self {
        Self { currency, usd_per_unit, updated_at: Utc::now() }
    }

    /// Converts a USD amount into the crypto currency, rounded to 8 decimal places.
    pub fn convert(&self, amount: Cents) -> Option<Decimal> {
        if self.usd_per_unit <= Decimal::ZERO {
            return None;
        }
        amount.to_dollars_decimal().checked_div(self.usd_per_unit).map(|v| v.round_dp(8))
    }
}

//--------------------------------------    Order searches     ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    #[serde(default)]
    pub statuses: Vec<OrderStatusType>,
    pub updated_before: Option<DateTime<Utc>>,
    pub buyer_contact: Option<String>,
}

impl OrderQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.updated_before.is_none() && self.buyer_contact.is_none()
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn updated_before(mut self, time: DateTime<Utc>) -> Self {
        self.updated_before = Some(time);
        self
    }

    pub fn with_buyer_contact<S: Into<String>>(mut self, contact: S) -> Self {
        self.buyer_contact = Some(contact.into());
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&order.status)) &&
            self.updated_before.map(|t| order.updated_at < t).unwrap_or(true) &&
            self.buyer_contact.as_ref().map(|c| c.eq_ignore_ascii_case(&order.buyer_contact)).unwrap_or(true)
    }
}
