use std::fmt::Display;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CoinGateApiError;

//--------------------------------------   CreateOrderRequest  ---------------------------------------------------------
/// The body of `POST /orders`. Prices are always quoted in USD.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateOrderRequest {
    pub order_id: String,
    pub price_amount: Decimal,
    pub price_currency: String,
    pub receive_currency: String,
    pub title: String,
    pub description: String,
    pub callback_url: String,
    pub cancel_url: String,
    pub success_url: String,
}

//--------------------------------------     CoinGateOrder     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoinGateOrder {
    pub id: u64,
    pub status: String,
    pub payment_url: String,
    #[serde(default)]
    pub payment_address: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
}

//--------------------------------------     CoinGateStatus    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoinGateStatus {
    New,
    Pending,
    Confirming,
    Paid,
    Invalid,
    Expired,
    Canceled,
    Refunded,
    Other(String),
}

impl CoinGateStatus {
    /// Funds have been received and confirmed
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Paid)
    }

    /// The payment will never complete
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Invalid | Self::Expired | Self::Canceled)
    }
}

impl From<&str> for CoinGateStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Self::New,
            "pending" => Self::Pending,
            "confirming" => Self::Confirming,
            "paid" => Self::Paid,
            "invalid" => Self::Invalid,
            "expired" => Self::Expired,
            "canceled" | "cancelled" => Self::Canceled,
            "refunded" => Self::Refunded,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for CoinGateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Confirming => "confirming",
            Self::Paid => "paid",
            Self::Invalid => "invalid",
            Self::Expired => "expired",
            Self::Canceled => "canceled",
            Self::Refunded => "refunded",
            Self::Other(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

//--------------------------------------    CallbackPayload    ---------------------------------------------------------
/// The fields of a payment callback that the server cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    /// CoinGate's order id. This is the correlation id handed out when the order was created.
    pub id: String,
    /// Our own order id, echoed back
    pub order_id: Option<String>,
    pub status: CoinGateStatus,
}

impl CallbackPayload {
    /// Parses a callback body. CoinGate posts url-encoded forms, but JSON bodies are accepted too.
    pub fn parse(body: &[u8]) -> Result<Self, CoinGateApiError> {
        let text = std::str::from_utf8(body).map_err(|e| CoinGateApiError::MalformedCallback(e.to_string()))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(CoinGateApiError::MalformedCallback("Empty body".into()));
        }
        let (id, order_id, status) = if text.starts_with('{') {
            let value: Value =
                serde_json::from_str(text).map_err(|e| CoinGateApiError::MalformedCallback(e.to_string()))?;
            (json_field(&value, "id"), json_field(&value, "order_id"), json_field(&value, "status"))
        } else {
            let mut id = None;
            let mut order_id = None;
            let mut status = None;
            for (key, val) in url::form_urlencoded::parse(text.as_bytes()) {
                match key.as_ref() {
                    "id" => id = Some(val.into_owned()),
                    "order_id" => order_id = Some(val.into_owned()),
                    "status" => status = Some(val.into_owned()),
                    _ => {},
                }
            }
            (id, order_id, status)
        };
        let id = id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CoinGateApiError::MalformedCallback("Missing 'id'".into()))?;
        let status = status
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CoinGateApiError::MalformedCallback("Missing 'status'".into()))?;
        Ok(Self { id: id.trim().to_string(), order_id, status: CoinGateStatus::from(status.as_str()) })
    }
}

/// CoinGate sends ids as numbers in JSON, but everything else as strings
fn json_field(value: &Value, name: &str) -> Option<String> {
    match &value[name] {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
