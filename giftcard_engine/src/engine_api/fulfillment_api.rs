//! The order fulfillment state machine.
//!
//! | Current      | Event                                  | Next         |
//! |--------------|----------------------------------------|--------------|
//! | `pending`    | payment confirmed                      | `paid`       |
//! | `pending`    | payment rejected                       | `failed`     |
//! | `paid`       | fulfillment starts                     | `processing` |
//! | `processing` | every line item has a code             | `completed`  |
//! | `processing` | some line item could not be fulfilled  | `failed`     |
//! | any other    | any notification                       | unchanged    |
//!
//! Every transition is a compare-and-swap against the order store, and every decision is taken on state freshly read
//! from the store. Two callers racing on the same order can therefore never both start fulfillment.
use std::fmt::Debug;

use chrono::Utc;
use futures_util::{stream, StreamExt};
use log::*;
use tokio::time::{sleep, timeout};

use crate::{
    catalog::Catalog,
    db_types::{DeliveryUpdate, Order, OrderId, OrderStatusType},
    engine_api::{
        errors::FulfillmentError,
        order_objects::{FulfillmentOptions, FulfillmentResult, NotificationOutcome},
    },
    events::{EventProducers, OrderCompletedEvent, OrderFailedEvent, OrderPaidEvent},
    traits::{
        CardRequest,
        DeliveredCard,
        GiftCardNotifier,
        GiftCardProvider,
        IdempotencyKey,
        NotificationStatus,
        NotifierError,
        OrderStore,
        OrderStoreError,
        OrderSummary,
        PaymentGateway,
        ProviderError,
    },
};

/// How a single line item purchase settled
#[derive(Debug, Clone, PartialEq, Eq)]
enum ItemOutcome {
    Fulfilled,
    Failed,
    /// The order left `processing` while this item was in flight, so nothing was recorded
    Superseded,
}

pub struct FulfillmentApi<B, G, P, N> {
    db: B,
    gateway: G,
    provider: P,
    notifier: N,
    catalog: Catalog,
    options: FulfillmentOptions,
    producers: EventProducers,
}

impl<B, G, P, N> Debug for FulfillmentApi<B, G, P, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FulfillmentApi ({:?})", self.options)
    }
}

impl<B, G, P, N> FulfillmentApi<B, G, P, N> {
    pub fn new(db: B, gateway: G, provider: P, notifier: N, catalog: Catalog) -> Self {
        Self {
            db,
            gateway,
            provider,
            notifier,
            catalog,
            options: FulfillmentOptions::default(),
            producers: EventProducers::default(),
        }
    }

    pub fn with_options(mut self, options: FulfillmentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn options(&self) -> &FulfillmentOptions {
        &self.options
    }
}

impl<B, G, P, N> FulfillmentApi<B, G, P, N>
where
    B: OrderStore,
    G: PaymentGateway,
    P: GiftCardProvider,
    N: GiftCardNotifier,
{
    /// Authenticates a payment notification and applies it to the matching order.
    ///
    /// Only `pending` orders react to notifications. Anything else (a duplicate, an out-of-order delivery, a
    /// notification for an order that has already failed) is reported as [`NotificationOutcome::Ignored`] without
    /// touching the store. Notifications that cannot be authenticated or parsed are rejected before any lookup.
    pub async fn accept_notification(
        &self,
        raw: &[u8],
        signature: Option<&str>,
    ) -> Result<NotificationOutcome, FulfillmentError> {
        let notification = self.gateway.verify_notification(raw, signature).map_err(|e| {
            warn!("🔄️💳️ Rejecting payment notification: {e}");
            FulfillmentError::from(e)
        })?;
        let session_id = notification.correlation_id.trim();
        if session_id.is_empty() {
            return Err(FulfillmentError::NotificationMalformed("The correlation id is empty".into()));
        }
        let Some(order) = self.db.fetch_order_by_session_id(session_id).await? else {
            info!("🔄️💳️ Payment notification ({}) for unknown session {session_id}. Ignoring it.", notification.status);
            return Ok(NotificationOutcome::UnknownOrder(session_id.to_string()));
        };
        let order_id = order.order_id.clone();
        let target = match &notification.status {
            NotificationStatus::Confirmed => OrderStatusType::Paid,
            NotificationStatus::Rejected => OrderStatusType::Failed,
            NotificationStatus::Ignorable(status) => {
                debug!("🔄️💳️ Payment for order [{order_id}] is '{status}'. Nothing to do.");
                return Ok(NotificationOutcome::Ignored {
                    order_id,
                    status: order.status,
                    reason: format!("Payment status '{status}' does not affect the order"),
                });
            },
        };
        match self.db.transition_status(&order_id, OrderStatusType::Pending, target).await? {
            Some(order) if target == OrderStatusType::Paid => {
                info!("🔄️💳️ Payment for order [{order_id}] confirmed");
                self.producers.publish_order_paid(OrderPaidEvent::new(order)).await;
                Ok(NotificationOutcome::Paid(order_id))
            },
            Some(order) => {
                info!("🔄️💳️ Payment for order [{order_id}] was rejected. The order has failed.");
                self.producers.publish_order_failed(OrderFailedEvent::new(order, "Payment was rejected")).await;
                Ok(NotificationOutcome::Rejected(order_id))
            },
            None => {
                let status = self.current_status(&order_id).await?.unwrap_or(order.status);
                debug!("🔄️💳️ Order [{order_id}] is already {status}. Ignoring the {} notification.", notification.status);
                Ok(NotificationOutcome::Ignored {
                    order_id,
                    status,
                    reason: format!("A {} notification has no effect now", notification.status),
                })
            },
        }
    }

    /// Applies a payment notification and, if it confirmed payment, fulfils the order before returning.
    pub async fn handle_notification(
        &self,
        raw: &[u8],
        signature: Option<&str>,
    ) -> Result<(NotificationOutcome, Option<FulfillmentResult>), FulfillmentError> {
        let outcome = self.accept_notification(raw, signature).await?;
        let result = match &outcome {
            NotificationOutcome::Paid(order_id) => Some(self.fulfill_order(order_id).await?),
            _ => None,
        };
        Ok((outcome, result))
    }

    /// Fulfils a `paid` order.
    ///
    /// Only the caller that moves the order from `paid` to `processing` does any work. Everyone else gets
    /// [`FulfillmentResult::NotStarted`] with the status they found.
    pub async fn fulfill_order(&self, order_id: &OrderId) -> Result<FulfillmentResult, FulfillmentError> {
        match self.db.transition_status(order_id, OrderStatusType::Paid, OrderStatusType::Processing).await? {
            Some(order) => self.run_fulfillment(order).await,
            None => {
                let status =
                    self.current_status(order_id).await?.ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))?;
                debug!("🔄️🎁️ Order [{order_id}] is {status}. Not starting fulfillment.");
                Ok(FulfillmentResult::NotStarted(status))
            },
        }
    }

    /// Picks up an order whose fulfillment was interrupted.
    ///
    /// A `paid` order is fulfilled from scratch. A `processing` order only has its unsettled line items attempted;
    /// items that already hold a code are never purchased again, and the retried purchases reuse the original
    /// idempotency keys. Orders in any other state are left alone.
    ///
    /// Unlike the `paid` to `processing` claim, picking up a `processing` order is not exclusive. A `processing` order
    /// updated within [`FulfillmentOptions::resume_after`] is assumed to still be in flight and is not touched.
    pub async fn resume_order(&self, order_id: &OrderId) -> Result<FulfillmentResult, FulfillmentError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))?;
        match order.status {
            OrderStatusType::Paid => self.fulfill_order(order_id).await,
            OrderStatusType::Processing if self.is_recently_active(&order) => {
                info!(
                    "🔄️🎁️ Order [{order_id}] was updated at {} and may still be in progress. Not resuming it.",
                    order.updated_at
                );
                Ok(FulfillmentResult::NotStarted(OrderStatusType::Processing))
            },
            OrderStatusType::Processing => {
                info!("🔄️🎁️ Resuming fulfillment of order [{order_id}]");
                self.run_fulfillment(order).await
            },
            status => Ok(FulfillmentResult::NotStarted(status)),
        }
    }

    /// Delivers the codes of a `completed` order to the buyer again. The gift card provider is never called.
    pub async fn resend_codes(&self, order_id: &OrderId) -> Result<Order, FulfillmentError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))?;
        if order.status != OrderStatusType::Completed {
            return Err(FulfillmentError::NotCompleted(order.order_id, order.status));
        }
        match self.deliver_codes(&order).await {
            Ok(()) => {
                let order = self.db.fetch_order(order_id).await?.unwrap_or(order);
                Ok(order)
            },
            Err(e) => Err(FulfillmentError::DeliveryFailed(e.to_string())),
        }
    }

    fn is_recently_active(&self, order: &Order) -> bool {
        let idle = Utc::now().signed_duration_since(order.updated_at).to_std().unwrap_or_default();
        idle < self.options.resume_after
    }

    async fn current_status(&self, order_id: &OrderId) -> Result<Option<OrderStatusType>, OrderStoreError> {
        Ok(self.db.fetch_order(order_id).await?.map(|o| o.status))
    }

    /// Attempts every unsettled line item, waits for all of them to settle, then finalises the order.
    async fn run_fulfillment(&self, order: Order) -> Result<FulfillmentResult, FulfillmentError> {
        let pending = order.unsettled_items();
        let concurrency = self.options.max_concurrent_purchases.max(1);
        info!(
            "🔄️🎁️ Fulfilling {} of {} items for order [{}] ({concurrency} at a time)",
            pending.len(),
            order.items.len(),
            order.order_id
        );
        let outcomes = stream::iter(pending)
            .map(|index| self.fulfill_item(&order, index))
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .await;
        // Every item has settled. If any result could not be saved, leave the order in `processing` so that it can be
        // resumed; the idempotency keys make the retry safe.
        let mut fulfilled = 0usize;
        let mut failed = 0usize;
        for outcome in outcomes {
            match outcome {
                Ok(ItemOutcome::Fulfilled) => fulfilled += 1,
                Ok(ItemOutcome::Failed) => failed += 1,
                Ok(ItemOutcome::Superseded) => {},
                Err(e) => {
                    error!(
                        "🔄️🎁️ Could not save a purchase result for order [{}]: {e}. The order stays in processing \
                         until it is resumed.",
                        order.order_id
                    );
                    return Err(e.into());
                },
            }
        }
        debug!("🔄️🎁️ Order [{}]: {fulfilled} items fulfilled, {failed} failed in this run", order.order_id);
        self.finalize(&order.order_id).await
    }

    /// Purchases one line item, with a timeout on each attempt and bounded retries with exponential backoff for
    /// transient failures. The result is persisted before returning.
    async fn fulfill_item(&self, order: &Order, index: usize) -> Result<ItemOutcome, OrderStoreError> {
        let item = &order.items[index];
        let request = CardRequest {
            order_id: order.order_id.clone(),
            line_item_index: index,
            brand: item.brand.clone(),
            denomination: item.denomination,
            idempotency_key: IdempotencyKey::new(&order.order_id, index, &item.brand, item.denomination),
            recipient: order.buyer_contact.clone(),
        };
        let policy = self.options.purchase_retry;
        let mut attempt = 0;
        let result = loop {
            attempt += 1;
            trace!("🔄️🎁️ Purchase attempt {attempt} for {}", request.idempotency_key);
            let response = match timeout(policy.attempt_timeout, self.provider.purchase_card(&request)).await {
                Ok(response) => response,
                Err(_) => Err(ProviderError::Unavailable(format!("no response within {:?}", policy.attempt_timeout))),
            };
            match response {
                Ok(card) => break Ok(card),
                Err(e) if e.is_transient() && policy.can_retry(attempt) => {
                    let delay = policy.delay_after(attempt);
                    warn!(
                        "🔄️🎁️ Purchase attempt {attempt}/{} for {} failed: {e}. Retrying in {delay:?}",
                        policy.max_attempts, request.idempotency_key
                    );
                    sleep(delay).await;
                },
                Err(e) if e.is_transient() => break Err(format!("{e} (gave up after {attempt} attempts)")),
                Err(e) => break Err(e.to_string()),
            }
        };
        let order_id = &order.order_id;
        let recorded = match result {
            Ok(card) => {
                info!("🔄️🎁️ Item {index} ({} {}) of order [{order_id}] purchased", item.brand, item.denomination);
                self.db.record_gift_card(order_id, index, &card).await.map(|_| ItemOutcome::Fulfilled)
            },
            Err(reason) => {
                warn!("🔄️🎁️ Item {index} ({} {}) of order [{order_id}] failed: {reason}", item.brand, item.denomination);
                self.db.record_item_error(order_id, index, &reason).await.map(|_| ItemOutcome::Failed)
            },
        };
        match recorded {
            // A concurrent resume recorded this item first
            Err(OrderStoreError::ItemAlreadyFulfilled(..)) => Ok(ItemOutcome::Fulfilled),
            Err(OrderStoreError::OrderNotProcessing(_, status)) => {
                warn!("🔄️🎁️ Order [{order_id}] became {status} while item {index} was in flight");
                Ok(ItemOutcome::Superseded)
            },
            other => other,
        }
    }

    /// Moves a `processing` order to its terminal state, based on the line items as persisted.
    async fn finalize(&self, order_id: &OrderId) -> Result<FulfillmentResult, FulfillmentError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))?;
        if order.all_items_fulfilled() {
            let Some(order) =
                self.db.transition_status(order_id, OrderStatusType::Processing, OrderStatusType::Completed).await?
            else {
                let status = self.current_status(order_id).await?.unwrap_or(order.status);
                return Ok(FulfillmentResult::NotStarted(status));
            };
            info!("🔄️✅️ Order [{order_id}] completed");
            let delivered = match self.deliver_codes(&order).await {
                Ok(()) => true,
                Err(e) => {
                    error!("🔄️📧️ Order [{order_id}] is complete but its codes could not be delivered: {e}");
                    false
                },
            };
            self.producers.publish_order_completed(OrderCompletedEvent::new(order, delivered)).await;
            Ok(FulfillmentResult::Completed { delivered })
        } else {
            let failed_items = order.unfulfilled_items();
            let Some(order) =
                self.db.transition_status(order_id, OrderStatusType::Processing, OrderStatusType::Failed).await?
            else {
                let status = self.current_status(order_id).await?.unwrap_or(order.status);
                return Ok(FulfillmentResult::NotStarted(status));
            };
            let reason = format!("{} of {} items could not be fulfilled", failed_items.len(), order.items.len());
            if order.fulfilled_count() > 0 {
                error!(
                    "🔄️❌️ Order [{order_id}] failed after {} gift cards were purchased. {reason}. The purchased codes \
                     are kept on the order for manual resolution.",
                    order.fulfilled_count()
                );
            } else {
                warn!("🔄️❌️ Order [{order_id}] failed. {reason}");
            }
            self.producers.publish_order_failed(OrderFailedEvent::new(order, reason)).await;
            Ok(FulfillmentResult::Failed { failed_items })
        }
    }

    /// Sends the codes to the buyer, retrying transient failures, and records the outcome on the order.
    ///
    /// The order status is never changed here, whatever happens.
    async fn deliver_codes(&self, order: &Order) -> Result<(), NotifierError> {
        let summary = self.summary(order);
        let policy = self.options.delivery_retry;
        let mut attempt = 0;
        let result = loop {
            attempt += 1;
            let result = match timeout(policy.attempt_timeout, self.notifier.deliver(&order.buyer_contact, &summary)).await
            {
                Ok(result) => result,
                Err(_) => Err(NotifierError::Transient(format!("no response within {:?}", policy.attempt_timeout))),
            };
            match result {
                Ok(()) => break Ok(()),
                Err(e) if policy.can_retry(attempt) => {
                    let delay = policy.delay_after(attempt);
                    warn!("🔄️📧️ Delivery attempt {attempt} for order [{}] failed: {e}. Retrying in {delay:?}", order.order_id);
                    sleep(delay).await;
                },
                Err(e) => break Err(e),
            }
        };
        let update = match &result {
            Ok(()) => {
                info!("🔄️📧️ Gift cards for order [{}] delivered", order.order_id);
                DeliveryUpdate::Delivered
            },
            Err(e) => DeliveryUpdate::Failed(e.to_string()),
        };
        if let Err(e) = self.db.record_delivery(&order.order_id, update).await {
            error!("🔄️📧️ Could not record the delivery outcome for order [{}]: {e}", order.order_id);
        }
        result
    }

    fn summary(&self, order: &Order) -> OrderSummary {
        let cards = order
            .items
            .iter()
            .filter_map(|item| {
                item.code.as_ref().map(|code| DeliveredCard {
                    brand: item.brand.clone(),
                    denomination: item.denomination,
                    code: code.clone(),
                    pin: item.pin.clone(),
                    redemption_url: self.catalog.redemption_url(&item.brand).map(String::from),
                })
            })
            .collect();
        OrderSummary { order_id: order.order_id.clone(), total: order.total, cards }
    }
}
