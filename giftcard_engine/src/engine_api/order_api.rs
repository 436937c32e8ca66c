use std::fmt::Debug;

use chrono::Utc;
use gcm_common::Cents;
use log::*;

use crate::{
    catalog::Catalog,
    db_types::{LineItem, NewOrder, Order, OrderId},
    engine_api::{
        errors::OrderApiError,
        order_objects::{CreatedOrder, NewOrderRequest, MAX_ITEMS_PER_ORDER},
    },
    traits::{ExchangeRate, ExchangeRateError, ExchangeRates, OrderQueryFilter, OrderStore, PaymentGateway, SessionRequest},
};

/// `OrderApi` takes a buyer's selection and turns it into a `pending` order with an open payment session.
pub struct OrderApi<B, G, X> {
    db: B,
    gateway: G,
    rates: X,
    catalog: Catalog,
}

impl<B, G, X> Debug for OrderApi<B, G, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi")
    }
}

impl<B, G, X> OrderApi<B, G, X> {
    pub fn new(db: B, gateway: G, rates: X, catalog: Catalog) -> Self {
        Self { db, gateway, rates, catalog }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl<B, G, X> OrderApi<B, G, X>
where
    B: OrderStore,
    G: PaymentGateway,
    X: ExchangeRates,
{
    /// Creates a new order.
    ///
    /// The total is the sum of the item denominations, and the crypto amount is quoted from the current exchange rate.
    /// A payment session is requested from the gateway before anything is written. If the gateway fails, nothing is
    /// persisted.
    pub async fn create_order(&self, request: NewOrderRequest) -> Result<CreatedOrder, OrderApiError> {
        let items = self.validate_items(&request)?;
        let buyer_contact = validate_contact(&request.buyer_contact)?;
        let total: Cents = items.iter().map(|i| i.denomination).sum();
        let rate = self.rates.fetch_last_rate(request.payment_method).await?;
        let crypto_amount = rate.convert(total).ok_or_else(|| {
            ExchangeRateError::BackendError(format!("Cannot convert {total} at {}", describe_rate(&rate)))
        })?;
        let order_id = OrderId::random();
        let description = items.iter().map(|i| format!("{} {}", i.brand, i.denomination)).collect::<Vec<_>>().join(", ");
        let session_request = SessionRequest {
            order_id: order_id.clone(),
            price: total,
            receive_currency: request.payment_method,
            crypto_amount,
            title: format!("Gift Card Purchase - {total}"),
            description,
        };
        debug!("🔄️📦️ Requesting a payment session for order [{order_id}] ({total}, {crypto_amount} {})",
            request.payment_method.currency_code());
        let session = self.gateway.create_session(session_request).await.map_err(|e| {
            warn!("🔄️📦️ Payment session for order [{order_id}] could not be created: {e}");
            OrderApiError::PaymentGatewayError(e.to_string())
        })?;
        let new_order = NewOrder {
            order_id,
            items,
            payment_method: request.payment_method,
            crypto_amount,
            receive_address: session.receive_address.clone(),
            payment_url: session.pay_url.clone(),
            buyer_contact,
            provider_session_id: session.id.clone(),
            created_at: Utc::now(),
        };
        let order = self.db.insert_order(new_order).await?;
        info!(
            "🔄️📦️ Order [{}] created: {} items, {} payable in {}. Session {}",
            order.order_id,
            order.items.len(),
            order.total,
            order.payment_method,
            order.provider_session_id
        );
        Ok(CreatedOrder { order, session })
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError> {
        Ok(self.db.fetch_order(order_id).await?)
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderApiError> {
        Ok(self.db.search_orders(query).await?)
    }

    pub async fn crypto_rates(&self) -> Result<Vec<ExchangeRate>, OrderApiError> {
        Ok(self.rates.fetch_all_rates().await?)
    }

    /// Checks every requested item against the catalog, and returns the line items using the catalog's brand names.
    fn validate_items(&self, request: &NewOrderRequest) -> Result<Vec<LineItem>, OrderApiError> {
        if request.items.is_empty() {
            return Err(OrderApiError::InvalidItems("An order must contain at least one item".into()));
        }
        if request.items.len() > MAX_ITEMS_PER_ORDER {
            return Err(OrderApiError::InvalidItems(format!(
                "An order may contain at most {MAX_ITEMS_PER_ORDER} items"
            )));
        }
        request
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                if !item.denomination.is_positive() {
                    return Err(OrderApiError::InvalidItems(format!(
                        "Item {i} has a non-positive denomination ({})",
                        item.denomination
                    )));
                }
                self.catalog
                    .validate(&item.brand, item.denomination)
                    .and_then(|_| self.catalog.entry(&item.brand))
                    .map(|entry| LineItem::new(entry.brand.clone(), item.denomination))
                    .map_err(|e| OrderApiError::InvalidItems(format!("Item {i}: {e}")))
            })
            .collect()
    }
}

fn describe_rate(rate: &ExchangeRate) -> String {
    format!("${} per {}", rate.usd_per_unit, rate.currency.currency_code())
}

/// A light sanity check on the buyer's email address. Deliverability is the mail relay's problem.
fn validate_contact(contact: &str) -> Result<String, OrderApiError> {
    let contact = contact.trim();
    let valid = match contact.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() &&
                !domain.contains('@') &&
                domain.contains('.') &&
                !domain.starts_with('.') &&
                !domain.ends_with('.') &&
                !contact.chars().any(char::is_whitespace)
        },
        None => false,
    };
    if valid {
        Ok(contact.to_string())
    } else {
        Err(OrderApiError::InvalidBuyerContact(format!("'{contact}' is not an email address")))
    }
}
