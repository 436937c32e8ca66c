use crate::db_types::Order;

/// Payment for the order has been confirmed and fulfillment is about to start
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Every line item of the order holds a gift card
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCompletedEvent {
    pub order: Order,
    /// Whether the codes reached the buyer on the first attempt
    pub delivered: bool,
}

impl OrderCompletedEvent {
    pub fn new(order: Order, delivered: bool) -> Self {
        Self { order, delivered }
    }
}

/// The order has moved to `failed`. Any codes already purchased are still attached to its line items.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFailedEvent {
    pub order: Order,
    pub reason: String,
}

impl OrderFailedEvent {
    pub fn new<S: Into<String>>(order: Order, reason: S) -> Self {
        Self { order, reason: reason.into() }
    }

    /// True if some gift cards were purchased before the order failed. These orders need manual attention.
    pub fn is_partially_fulfilled(&self) -> bool {
        self.order.fulfilled_count() > 0
    }
}
