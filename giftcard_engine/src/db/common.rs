//! Checks shared by the store backends, so that every backend rejects the same line item updates with the same errors.
use crate::{
    db_types::{GiftCard, Order, OrderId, OrderStatusType},
    traits::OrderStoreError,
};

pub fn check_transition(from: OrderStatusType, to: OrderStatusType) -> Result<(), OrderStoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(OrderStoreError::IllegalTransition { from, to })
    }
}

/// What a pending line item write should do, given the current state of the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemWrite {
    /// The write may go ahead
    Apply,
    /// The item already holds exactly this card; nothing to do
    AlreadyRecorded,
}

/// Validates a write to the line item at `index`. `card` is `Some` when a gift card is being recorded and `None` when
/// a fulfillment error is being recorded.
pub fn check_item_write(
    order: Option<&Order>,
    order_id: &OrderId,
    index: usize,
    card: Option<&GiftCard>,
) -> Result<ItemWrite, OrderStoreError> {
    let order = order.ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))?;
    let item = order.items.get(index).ok_or_else(|| OrderStoreError::LineItemNotFound(order_id.clone(), index))?;
    match (item.gift_card(), card) {
        (Some(existing), Some(card)) if existing == *card => return Ok(ItemWrite::AlreadyRecorded),
        (Some(_), Some(_)) => return Err(OrderStoreError::CodeAlreadySet(order_id.clone(), index)),
        (Some(_), None) => return Err(OrderStoreError::ItemAlreadyFulfilled(order_id.clone(), index)),
        (None, _) => {},
    }
    if order.status != OrderStatusType::Processing {
        return Err(OrderStoreError::OrderNotProcessing(order_id.clone(), order.status));
    }
    Ok(ItemWrite::Apply)
}
