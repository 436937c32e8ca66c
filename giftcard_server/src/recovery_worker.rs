use std::time::Duration;

use chrono::Utc;
use giftcard_engine::{
    db_types::{Order, OrderStatusType},
    order_objects::FulfillmentResult,
    traits::OrderQueryFilter,
    FulfillmentApi,
    FulfillmentError,
    GiftCardNotifier,
    GiftCardProvider,
    OrderStore,
    PaymentGateway,
};
use log::*;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub found: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Starts the recovery worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, orders that have sat in `paid` or `processing` for longer than `stalled_age` are resumed. This
/// picks up orders whose fulfillment was cut short by a crash or restart.
pub fn start_recovery_worker<B, G, P, N>(
    api: FulfillmentApi<B, G, P, N>,
    interval: Duration,
    stalled_age: Duration,
) -> JoinHandle<()>
where
    B: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: GiftCardProvider + 'static,
    N: GiftCardNotifier + 'static,
{
    actix_web::rt::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Stalled order recovery worker started");
        loop {
            timer.tick().await;
            debug!("🕰️ Running stalled order recovery job");
            match recover_stalled_orders(&api, stalled_age).await {
                Ok(report) if report.found == 0 => debug!("🕰️ No stalled orders found"),
                Ok(report) => info!(
                    "🕰️ Resumed {} stalled orders. {} completed, {} failed, {} skipped, {} errors",
                    report.found, report.completed, report.failed, report.skipped, report.errors
                ),
                Err(e) => error!("🕰️ Error running stalled order recovery job: {e}"),
            }
        }
    })
}

/// Resumes every `paid` or `processing` order that was last updated more than `stalled_age` ago.
pub async fn recover_stalled_orders<B, G, P, N>(
    api: &FulfillmentApi<B, G, P, N>,
    stalled_age: Duration,
) -> Result<RecoveryReport, FulfillmentError>
where
    B: OrderStore,
    G: PaymentGateway,
    P: GiftCardProvider,
    N: GiftCardNotifier,
{
    let age = chrono::Duration::from_std(stalled_age).unwrap_or_else(|_| chrono::Duration::days(1));
    let filter = OrderQueryFilter::default()
        .with_status(OrderStatusType::Paid)
        .with_status(OrderStatusType::Processing)
        .updated_before(Utc::now() - age);
    let stalled = api.db().search_orders(filter).await?;
    let mut report = RecoveryReport { found: stalled.len(), ..Default::default() };
    if !stalled.is_empty() {
        info!("🕰️ Found {} stalled orders: {}", stalled.len(), order_list(&stalled));
    }
    for order in stalled {
        match api.resume_order(&order.order_id).await {
            Ok(FulfillmentResult::Completed { .. }) => report.completed += 1,
            Ok(FulfillmentResult::Failed { .. }) => report.failed += 1,
            Ok(FulfillmentResult::NotStarted(status)) => {
                debug!("🕰️ Order {} is now {status}. Skipping it.", order.order_id);
                report.skipped += 1;
            },
            Err(e) => {
                warn!("🕰️ Could not resume order {}. {e}", order.order_id);
                report.errors += 1;
            },
        }
    }
    Ok(report)
}

fn order_list(orders: &[Order]) -> String {
    orders.iter().map(|o| format!("[{}] {}", o.order_id, o.status)).collect::<Vec<String>>().join(", ")
}

#[cfg(test)]
mod test {
    use gcm_common::Cents;
    use giftcard_engine::{
        catalog::Catalog,
        db_types::PaymentMethod,
        order_objects::{ItemRequest, NewOrderRequest, NotificationOutcome},
        test_utils::fakes::{FakeGateway, FakeNotifier, FakeProvider, FAKE_SIGNATURE},
        traits::StaticExchangeRates,
        InMemoryOrderStore,
        OrderApi,
    };

    use super::*;

    type Api = FulfillmentApi<InMemoryOrderStore, FakeGateway, FakeProvider, FakeNotifier>;

    async fn paid_order(store: &InMemoryOrderStore, gateway: &FakeGateway, api: &Api) -> Order {
        let orders = OrderApi::new(store.clone(), gateway.clone(), StaticExchangeRates::default(), Catalog::default());
        let request = NewOrderRequest {
            items: vec![
                ItemRequest::new("Amazon", Cents::from_dollars(25)),
                ItemRequest::new("Spotify", Cents::from_dollars(10)),
            ],
            payment_method: PaymentMethod::Litecoin,
            buyer_contact: "buyer@example.com".into(),
        };
        let created = orders.create_order(request).await.unwrap();
        let body = FakeGateway::notification(&created.session.id, "paid");
        let outcome = api.accept_notification(&body, Some(FAKE_SIGNATURE)).await.unwrap();
        assert_eq!(outcome, NotificationOutcome::Paid(created.order.order_id.clone()));
        created.order
    }

    #[tokio::test]
    async fn stalled_orders_are_resumed() {
        let _ = env_logger::try_init();
        let store = InMemoryOrderStore::new();
        let gateway = FakeGateway::new();
        let provider = FakeProvider::new();
        let notifier = FakeNotifier::new();
        let api =
            FulfillmentApi::new(store.clone(), gateway.clone(), provider.clone(), notifier.clone(), Catalog::default());
        let order = paid_order(&store, &gateway, &api).await;

        // Recently paid orders are not stalled yet
        let report = recover_stalled_orders(&api, Duration::from_secs(600)).await.unwrap();
        assert_eq!(report, RecoveryReport::default());
        assert_eq!(provider.calls(), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let report = recover_stalled_orders(&api, Duration::from_millis(10)).await.unwrap();
        assert_eq!(report, RecoveryReport { found: 1, completed: 1, ..Default::default() });
        let order = store.fetch_order(&order.order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatusType::Completed);
        assert_eq!(provider.cards_issued(), 2);
        assert_eq!(notifier.deliveries().len(), 1);

        // Completed orders are never picked up again
        let report = recover_stalled_orders(&api, Duration::ZERO).await.unwrap();
        assert_eq!(report.found, 0);
        assert_eq!(provider.calls(), 2);
    }
}
