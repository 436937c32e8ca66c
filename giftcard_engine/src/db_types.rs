use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use gcm_common::Cents;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh order id of the form `ORD-<unix millis>-<8 hex chars>`.
    pub fn random() -> Self {
        let suffix = rand::random::<u32>();
        Self(format!("ORD-{}-{suffix:08x}", Utc::now().timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("Order id cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been created and a payment session is open. No payment has been confirmed yet.
    Pending,
    /// The payment gateway has confirmed payment. Fulfillment has not started.
    Paid,
    /// Gift cards are being purchased for the line items.
    Processing,
    /// Every line item holds a gift card code. Terminal.
    Completed,
    /// Payment was rejected, or at least one line item could not be fulfilled. Terminal.
    Failed,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The order lifecycle only ever moves forward:
    ///
    /// | From         | To                       |
    /// |--------------|--------------------------|
    /// | `pending`    | `paid`, `failed`         |
    /// | `paid`       | `processing`, `failed`   |
    /// | `processing` | `completed`, `failed`    |
    ///
    /// Terminal states have no outgoing edges.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, next),
            (Pending, Paid) |
                (Pending, Failed) |
                (Paid, Processing) |
                (Paid, Failed) |
                (Processing, Completed) |
                (Processing, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Bitcoin,
    Ethereum,
    Litecoin,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [Self::Bitcoin, Self::Ethereum, Self::Litecoin];

    /// The ticker the payment processor uses for this currency
    pub fn currency_code(&self) -> &'static str {
        match self {
            Self::Bitcoin => "BTC",
            Self::Ethereum => "ETH",
            Self::Litecoin => "LTC",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bitcoin => "bitcoin",
            Self::Ethereum => "ethereum",
            Self::Litecoin => "litecoin",
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "btc" => Ok(Self::Bitcoin),
            "ethereum" | "eth" => Ok(Self::Ethereum),
            "litecoin" | "ltc" => Ok(Self::Litecoin),
            s => Err(ConversionError(format!("Unsupported payment method: {s}"))),
        }
    }
}

//--------------------------------------       GiftCard        ---------------------------------------------------------
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftCard {
    pub code: String,
    pub pin: Option<String>,
}

impl GiftCard {
    pub fn new<S: Into<String>>(code: S, pin: Option<String>) -> Self {
        Self { code: code.into(), pin }
    }
}

// Codes are bearer credentials. Keep them out of logs.
impl std::fmt::Debug for GiftCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GiftCard").field("code", &"****").field("pin", &self.pin.as_ref().map(|_| "****")).finish()
    }
}

//--------------------------------------       LineItem        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub brand: String,
    pub denomination: Cents,
    pub code: Option<String>,
    pub pin: Option<String>,
    pub fulfillment_error: Option<String>,
}

impl LineItem {
    pub fn new<S: Into<String>>(brand: S, denomination: Cents) -> Self {
        Self { brand: brand.into(), denomination, code: None, pin: None, fulfillment_error: None }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.code.is_some()
    }

    pub fn gift_card(&self) -> Option<GiftCard> {
        self.code.as_ref().map(|code| GiftCard { code: code.clone(), pin: self.pin.clone() })
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub items: Vec<LineItem>,
    pub total: Cents,
    pub payment_method: PaymentMethod,
    pub crypto_amount: Decimal,
    pub receive_address: Option<String>,
    pub payment_url: String,
    pub buyer_contact: String,
    pub status: OrderStatusType,
    pub provider_session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivery_error: Option<String>,
}

impl Order {
    pub fn all_items_fulfilled(&self) -> bool {
        self.items.iter().all(LineItem::is_fulfilled)
    }

    pub fn fulfilled_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_fulfilled()).count()
    }

    /// Indices of line items that have neither a code nor a recorded failure
    pub fn unsettled_items(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.code.is_none() && i.fulfillment_error.is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Indices of line items that do not have a code yet, whether or not a previous attempt failed
    pub fn unfulfilled_items(&self) -> Vec<usize> {
        self.items.iter().enumerate().filter(|(_, i)| !i.is_fulfilled()).map(|(idx, _)| idx).collect()
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
    pub crypto_amount: Decimal,
    pub receive_address: Option<String>,
    pub payment_url: String,
    pub buyer_contact: String,
    pub provider_session_id: String,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// The order total is always derived from the line items
    pub fn total(&self) -> Cents {
        self.items.iter().map(|i| i.denomination).sum()
    }
}

//--------------------------------------    DeliveryUpdate     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryUpdate {
    Delivered,
    Failed(String),
}
