use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::Utc;
use log::*;
use tokio::sync::RwLock;

use crate::{
    db::common::{check_item_write, check_transition, ItemWrite},
    db_types::{DeliveryUpdate, GiftCard, NewOrder, Order, OrderId, OrderStatusType},
    traits::{OrderQueryFilter, OrderStore, OrderStoreError},
};

/// A thread-safe in-memory order store.
///
/// All orders live in one `Arc<RwLock<HashMap>>`, so clones share state. Every mutation takes the write lock for the
/// whole read-check-write sequence, which makes each operation atomic with respect to the others.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    mutations: Arc<AtomicU64>,
}

impl std::fmt::Debug for InMemoryOrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InMemoryOrderStore ({} mutations)", self.mutation_count())
    }
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of successful writes made to the store since it was created
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

impl OrderStore for InMemoryOrderStore {
    fn url(&self) -> &str {
        "memory://"
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_id) {
            return Err(OrderStoreError::OrderAlreadyExists(order.order_id));
        }
        if orders.values().any(|o| o.provider_session_id == order.provider_session_id) {
            return Err(OrderStoreError::SessionIdInUse(order.provider_session_id));
        }
        let total = order.total();
        let order = Order {
            order_id: order.order_id,
            items: order.items,
            total,
            payment_method: order.payment_method,
            crypto_amount: order.crypto_amount,
            receive_address: order.receive_address,
            payment_url: order.payment_url,
            buyer_contact: order.buyer_contact,
            status: OrderStatusType::Pending,
            provider_session_id: order.provider_session_id,
            created_at: order.created_at,
            updated_at: order.created_at,
            delivered_at: None,
            delivery_error: None,
        };
        orders.insert(order.order_id.clone(), order.clone());
        self.mutated();
        debug!("🗃️ Order [{}] inserted", order.order_id);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }

    async fn fetch_order_by_session_id(&self, session_id: &str) -> Result<Option<Order>, OrderStoreError> {
        let orders = self.orders.read().await;
        Ok(orders.values().find(|o| o.provider_session_id == session_id).cloned())
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderStoreError> {
        let orders = self.orders.read().await;
        let mut result = orders.values().filter(|o| query.matches(o)).cloned().collect::<Vec<_>>();
        result.sort_by_key(|o| o.created_at);
        Ok(result)
    }

    async fn transition_status(
        &self,
        order_id: &OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, OrderStoreError> {
        check_transition(from, to)?;
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(None);
        };
        if order.status != from {
            trace!("🗃️ Order [{order_id}] is {}, not {from}. Not moving it to {to}", order.status);
            return Ok(None);
        }
        if to == OrderStatusType::Completed && !order.all_items_fulfilled() {
            return Err(OrderStoreError::UnfulfilledItems(order_id.clone()));
        }
        order.status = to;
        order.updated_at = Utc::now();
        let order = order.clone();
        self.mutated();
        debug!("🗃️ Order [{order_id}] moved from {from} to {to}");
        Ok(Some(order))
    }

    async fn record_gift_card(
        &self,
        order_id: &OrderId,
        index: usize,
        card: &GiftCard,
    ) -> Result<Order, OrderStoreError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_id);
        let write = check_item_write(order.as_deref(), order_id, index, Some(card))?;
        let order = order.ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))?;
        if write == ItemWrite::AlreadyRecorded {
            trace!("🗃️ Item {index} of order [{order_id}] already holds this gift card");
            return Ok(order.clone());
        }
        let item = &mut order.items[index];
        item.code = Some(card.code.clone());
        item.pin = card.pin.clone();
        item.fulfillment_error = None;
        order.updated_at = Utc::now();
        self.mutated();
        debug!("🗃️ Gift card recorded for item {index} of order [{order_id}]");
        Ok(order.clone())
    }

    async fn record_item_error(&self, order_id: &OrderId, index: usize, error: &str) -> Result<Order, OrderStoreError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_id);
        check_item_write(order.as_deref(), order_id, index, None)?;
        let order = order.ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))?;
        order.items[index].fulfillment_error = Some(error.to_string());
        order.updated_at = Utc::now();
        self.mutated();
        debug!("🗃️ Fulfillment error recorded for item {index} of order [{order_id}]");
        Ok(order.clone())
    }

    async fn record_delivery(&self, order_id: &OrderId, update: DeliveryUpdate) -> Result<Order, OrderStoreError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_id).ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))?;
        let now = Utc::now();
        match update {
            DeliveryUpdate::Delivered => {
                order.delivered_at = Some(now);
                order.delivery_error = None;
            },
            DeliveryUpdate::Failed(reason) => order.delivery_error = Some(reason),
        }
        order.updated_at = now;
        self.mutated();
        Ok(order.clone())
    }
}
