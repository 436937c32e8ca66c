use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use gcm_common::Cents;
use giftcard_engine::{
    db_types::{LineItem, Order, OrderStatusType, PaymentMethod},
    order_objects::{CreatedOrder, ItemRequest, NewOrderRequest},
    traits::{ExchangeRate, OrderQueryFilter},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//--------------------------------------     Order creation    ---------------------------------------------------------
/// One gift card in the buyer's cart. `value` is the face value in dollars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub brand: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<CartItem>,
    pub payment_method: String,
    pub email: String,
}

impl TryFrom<CreateOrderRequest> for NewOrderRequest {
    type Error = ServerError;

    fn try_from(value: CreateOrderRequest) -> Result<Self, Self::Error> {
        let payment_method = PaymentMethod::from_str(&value.payment_method)
            .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
        let items = value
            .items
            .into_iter()
            .map(|item| {
                let denomination = Cents::try_from(item.value).map_err(|e| {
                    ServerError::InvalidRequestBody(format!("{} gift card has an invalid value: {e}", item.brand))
                })?;
                Ok(ItemRequest::new(item.brand, denomination))
            })
            .collect::<Result<Vec<_>, ServerError>>()?;
        Ok(NewOrderRequest { items, payment_method, buyer_contact: value.email })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub payment_url: String,
    pub wallet_address: Option<String>,
    pub crypto_amount: Decimal,
    pub total: Decimal,
}

impl From<CreatedOrder> for CreateOrderResponse {
    fn from(value: CreatedOrder) -> Self {
        let CreatedOrder { order, session } = value;
        Self {
            order_id: order.order_id.to_string(),
            payment_url: session.pay_url,
            wallet_address: session.receive_address,
            crypto_amount: order.crypto_amount,
            total: order.total.to_dollars_decimal(),
        }
    }
}

//--------------------------------------     Order lookups     ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    pub brand: String,
    pub value: Decimal,
    pub code: Option<String>,
    pub pin: Option<String>,
    pub error: Option<String>,
}

impl From<LineItem> for LineItemView {
    fn from(item: LineItem) -> Self {
        Self {
            brand: item.brand,
            value: item.denomination.to_dollars_decimal(),
            code: item.code,
            pin: item.pin,
            error: item.fulfillment_error,
        }
    }
}

/// The public view of an order, including the codes of any fulfilled items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_id: String,
    pub status: OrderStatusType,
    pub items: Vec<LineItemView>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub crypto_amount: Decimal,
    pub payment_url: String,
    pub wallet_address: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivery_error: Option<String>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            status: order.status,
            items: order.items.into_iter().map(LineItemView::from).collect(),
            total: order.total.to_dollars_decimal(),
            payment_method: order.payment_method,
            crypto_amount: order.crypto_amount,
            payment_url: order.payment_url,
            wallet_address: order.receive_address,
            email: order.buyer_contact,
            created_at: order.created_at,
            updated_at: order.updated_at,
            delivered_at: order.delivered_at,
            delivery_error: order.delivery_error,
        }
    }
}

/// Exchange rates keyed by payment method, e.g. `{"bitcoin": "45000"}`
pub fn rates_map(rates: Vec<ExchangeRate>) -> BTreeMap<String, Decimal> {
    rates.into_iter().map(|r| (r.currency.to_string(), r.usd_per_unit)).collect()
}

//--------------------------------------     Admin queries     ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminOrderQuery {
    /// Comma-separated list of statuses
    pub status: Option<String>,
    pub email: Option<String>,
    pub updated_before: Option<DateTime<Utc>>,
}

impl TryFrom<AdminOrderQuery> for OrderQueryFilter {
    type Error = ServerError;

    fn try_from(value: AdminOrderQuery) -> Result<Self, Self::Error> {
        let mut filter = OrderQueryFilter::default();
        if let Some(statuses) = value.status {
            for s in gcm_common::helpers::split_list(&statuses) {
                let status =
                    OrderStatusType::from_str(&s).map_err(|e| ServerError::InvalidRequestPath(e.to_string()))?;
                filter = filter.with_status(status);
            }
        }
        if let Some(email) = value.email.filter(|e| !e.trim().is_empty()) {
            filter = filter.with_buyer_contact(email.trim());
        }
        if let Some(t) = value.updated_before {
            filter = filter.updated_before(t);
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn create_order_request_from_json() {
        let json = r#"{"items":[{"brand":"Amazon","value":25},{"brand":"Steam","value":"10.00"}],
            "paymentMethod":"BTC","email":"buyer@example.com"}"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        let req = NewOrderRequest::try_from(req).unwrap();
        assert_eq!(req.payment_method, PaymentMethod::Bitcoin);
        assert_eq!(req.items[0], ItemRequest::new("Amazon", Cents::from_dollars(25)));
        assert_eq!(req.items[1], ItemRequest::new("Steam", Cents::from_dollars(10)));
        assert_eq!(req.buyer_contact, "buyer@example.com");
    }

    #[test]
    fn bad_create_order_requests() {
        let req = CreateOrderRequest { items: vec![], payment_method: "dogecoin".into(), email: "a@b.co".into() };
        assert!(matches!(NewOrderRequest::try_from(req), Err(ServerError::InvalidRequestBody(_))));
        let req = CreateOrderRequest {
            items: vec![CartItem { brand: "Amazon".into(), value: Decimal::new(25005, 3) }],
            payment_method: "ethereum".into(),
            email: "a@b.co".into(),
        };
        assert!(matches!(NewOrderRequest::try_from(req), Err(ServerError::InvalidRequestBody(_))));
    }

    #[test]
    fn admin_queries() {
        let q = AdminOrderQuery { status: Some("paid, processing".into()), email: Some(" ".into()), ..Default::default() };
        let filter = OrderQueryFilter::try_from(q).unwrap();
        assert_eq!(filter.statuses, vec![OrderStatusType::Paid, OrderStatusType::Processing]);
        assert!(filter.buyer_contact.is_none());
        let q = AdminOrderQuery { status: Some("lost".into()), ..Default::default() };
        assert!(OrderQueryFilter::try_from(q).is_err());
    }
}
