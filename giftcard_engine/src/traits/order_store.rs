use thiserror::Error;

use crate::{
    db_types::{DeliveryUpdate, GiftCard, NewOrder, Order, OrderId, OrderStatusType},
    traits::OrderQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} has no line item at index {1}")]
    LineItemNotFound(OrderId, usize),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Payment session {0} is already attached to another order")]
    SessionIdInUse(String),
    #[error("An order cannot move from {from} to {to}")]
    IllegalTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Line item {1} of order {0} already has a different gift card code")]
    CodeAlreadySet(OrderId, usize),
    #[error("Line item {1} of order {0} has already been fulfilled")]
    ItemAlreadyFulfilled(OrderId, usize),
    #[error("Order {0} cannot be completed while some line items have no gift card")]
    UnfulfilledItems(OrderId),
    #[error("Order {0} is {1}. Line items can only be updated while the order is processing")]
    OrderNotProcessing(OrderId, OrderStatusType),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}

/// Durable, keyed storage of [`Order`] records.
///
/// Every mutating method is a single atomic operation on one order. Implementations must guarantee that two concurrent
/// callers can never both succeed in moving the same order out of the same state.
#[allow(async_fn_in_trait)]
pub trait OrderStore {
    /// The URL (or a descriptive name) of the backing store
    fn url(&self) -> &str;

    /// Persists a new order in the `pending` state. The order id and the provider session id must both be unique.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;

    /// Secondary lookup, used to match incoming payment notifications to orders.
    async fn fetch_order_by_session_id(&self, session_id: &str) -> Result<Option<Order>, OrderStoreError>;

    /// Fetches orders matching the filter, ordered by `created_at` ascending.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderStoreError>;

    /// Atomically moves the order from `from` to `to`, if and only if its current status is `from`.
    ///
    /// Returns the updated order on success, or `None` if the order was not in the `from` state (including the case
    /// where the order does not exist). Requests for an edge that the lifecycle does not allow fail with
    /// [`OrderStoreError::IllegalTransition`] and never touch the store. Moving to `completed` while any line item lacks
    /// a code fails with [`OrderStoreError::UnfulfilledItems`].
    async fn transition_status(
        &self,
        order_id: &OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, OrderStoreError>;

    /// Writes a purchased gift card onto the line item at `index`.
    ///
    /// Codes are write-once. Recording the identical card again is a no-op; recording a different card for a line
    /// item that already holds a code fails with [`OrderStoreError::CodeAlreadySet`]. A successful write clears any
    /// previously recorded fulfillment error for the item. The order must be `processing`.
    async fn record_gift_card(&self, order_id: &OrderId, index: usize, card: &GiftCard)
        -> Result<Order, OrderStoreError>;

    /// Records why the line item at `index` could not be fulfilled. The order must be `processing`, and the item must
    /// not already hold a code.
    async fn record_item_error(&self, order_id: &OrderId, index: usize, error: &str) -> Result<Order, OrderStoreError>;

    /// Records the outcome of delivering the codes to the buyer. The order status is never changed.
    async fn record_delivery(&self, order_id: &OrderId, update: DeliveryUpdate) -> Result<Order, OrderStoreError>;

    async fn close(&mut self) -> Result<(), OrderStoreError> {
        Ok(())
    }
}
