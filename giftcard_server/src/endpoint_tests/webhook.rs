use std::time::Duration;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use giftcard_engine::{
    catalog::Catalog,
    db_types::{Cents, Order, OrderId, OrderStatusType, PaymentMethod},
    order_objects::{CreatedOrder, ItemRequest, NewOrderRequest},
    test_utils::fakes::{FakeGateway, FakeNotifier, FakeProvider, FAKE_SIGNATURE},
    traits::{OrderStore, OrderStoreError, StaticExchangeRates},
    FulfillmentApi,
    InMemoryOrderStore,
    OrderApi,
};
use log::*;

use super::{
    helpers::{fulfillment_api, post_request, test_options},
    mocks::MockStore,
};
use crate::{
    data_objects::JsonResponse,
    routes::{PaymentWebhookRoute, PAYMENT_SIGNATURE_HEADER},
};

struct Shop {
    store: InMemoryOrderStore,
    gateway: FakeGateway,
    provider: FakeProvider,
    notifier: FakeNotifier,
}

impl Shop {
    fn new() -> Self {
        let _ = env_logger::try_init().ok();
        Self {
            store: InMemoryOrderStore::new(),
            gateway: FakeGateway::new(),
            provider: FakeProvider::new(),
            notifier: FakeNotifier::new(),
        }
    }

    async fn create_order(&self) -> CreatedOrder {
        let rates = StaticExchangeRates::default();
        let api = OrderApi::new(self.store.clone(), self.gateway.clone(), rates, Catalog::default());
        let request = NewOrderRequest {
            items: vec![
                ItemRequest::new("Amazon", Cents::from_dollars(25)),
                ItemRequest::new("Steam", Cents::from_dollars(10)),
            ],
            payment_method: PaymentMethod::Litecoin,
            buyer_contact: "buyer@example.com".into(),
        };
        api.create_order(request).await.expect("order creation failed")
    }

    fn configure(&self) -> impl FnOnce(&mut ServiceConfig) {
        let api = fulfillment_api(&self.store, &self.gateway, &self.provider, &self.notifier);
        move |cfg: &mut ServiceConfig| {
            cfg.app_data(web::Data::new(api))
                .service(PaymentWebhookRoute::<InMemoryOrderStore, FakeGateway, FakeProvider, FakeNotifier>::new());
        }
    }

    async fn notify(&self, body: Vec<u8>, signature: Option<&str>) -> (StatusCode, String) {
        let headers = signature.map(|s| vec![(PAYMENT_SIGNATURE_HEADER, s)]).unwrap_or_default();
        post_request("/payment", &headers, body, self.configure()).await.expect("Failed to make request")
    }

    async fn notify_status(&self, session_id: &str, status: &str) -> (StatusCode, String) {
        self.notify(FakeGateway::notification(session_id, status), Some(FAKE_SIGNATURE)).await
    }

    async fn order(&self, order_id: &OrderId) -> Order {
        self.store.fetch_order(order_id).await.unwrap().unwrap()
    }

    /// Polls the store until the background fulfillment has completed the order and recorded the delivery
    async fn wait_for_delivery(&self, order_id: &OrderId) -> Order {
        for _ in 0..300 {
            let order = self.order(order_id).await;
            if order.status == OrderStatusType::Completed && order.delivered_at.is_some() {
                return order;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Order {order_id} was never delivered. It is {}", self.order(order_id).await.status);
    }
}

fn acknowledged(body: &str) -> JsonResponse {
    let response: JsonResponse = serde_json::from_str(body).unwrap();
    assert!(response.success, "was: {body}");
    response
}

#[actix_web::test]
async fn unsigned_notifications_are_rejected() {
    let shop = Shop::new();
    let created = shop.create_order().await;
    let body = FakeGateway::notification(&created.session.id, "paid");
    let (status, response) = shop.notify(body.clone(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "was: {response}");
    let (status, _) = shop.notify(body, Some("forged-signature")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(shop.order(&created.order.order_id).await.status, OrderStatusType::Pending);
    assert_eq!(shop.provider.calls(), 0);
}

#[actix_web::test]
async fn malformed_notifications_are_rejected() {
    let shop = Shop::new();
    let mutations = shop.store.mutation_count();
    let bodies: [&[u8]; 3] = [b"not json", br#"{"status":"paid"}"#, br#"{"id":"","status":"paid"}"#];
    for body in bodies {
        let (status, response) = shop.notify(body.to_vec(), Some(FAKE_SIGNATURE)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "was: {response}");
    }
    assert_eq!(shop.store.mutation_count(), mutations);
}

#[actix_web::test]
async fn unknown_sessions_are_acknowledged() {
    let shop = Shop::new();
    let (status, body) = shop.notify_status("session-404", "paid").await;
    assert_eq!(status, StatusCode::OK);
    let response = acknowledged(&body);
    assert!(response.message.contains("session-404"), "was: {body}");
    assert_eq!(shop.provider.calls(), 0);
}

#[actix_web::test]
async fn paid_notification_fulfils_the_order() {
    let shop = Shop::new();
    let created = shop.create_order().await;
    let order_id = created.order.order_id.clone();
    let (status, body) = shop.notify_status(&created.session.id, "paid").await;
    assert_eq!(status, StatusCode::OK);
    info!("Response body: {body}");
    acknowledged(&body);

    let order = shop.wait_for_delivery(&order_id).await;
    assert!(order.all_items_fulfilled());
    assert_eq!(shop.provider.cards_issued(), 2);
    let deliveries = shop.notifier.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, "buyer@example.com");
}

#[actix_web::test]
async fn duplicate_paid_notifications_purchase_once() {
    let shop = Shop::new();
    let created = shop.create_order().await;
    let order_id = created.order.order_id.clone();
    for _ in 0..3 {
        let (status, body) = shop.notify_status(&created.session.id, "paid").await;
        assert_eq!(status, StatusCode::OK);
        acknowledged(&body);
    }
    shop.wait_for_delivery(&order_id).await;
    let mutations = shop.store.mutation_count();

    // A late duplicate after completion changes nothing
    let (status, body) = shop.notify_status(&created.session.id, "paid").await;
    assert_eq!(status, StatusCode::OK);
    acknowledged(&body);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(shop.store.mutation_count(), mutations);
    assert_eq!(shop.provider.calls(), 2);
    assert_eq!(shop.provider.cards_issued(), 2);
    assert_eq!(shop.notifier.deliveries().len(), 1);
}

#[actix_web::test]
async fn intermediate_statuses_are_acknowledged() {
    let shop = Shop::new();
    let created = shop.create_order().await;
    let mutations = shop.store.mutation_count();
    for s in ["new", "pending", "confirming"] {
        let (status, body) = shop.notify_status(&created.session.id, s).await;
        assert_eq!(status, StatusCode::OK);
        acknowledged(&body);
    }
    assert_eq!(shop.order(&created.order.order_id).await.status, OrderStatusType::Pending);
    assert_eq!(shop.store.mutation_count(), mutations);
}

#[actix_web::test]
async fn rejected_payment_fails_the_order() {
    let shop = Shop::new();
    let created = shop.create_order().await;
    let (status, body) = shop.notify_status(&created.session.id, "expired").await;
    assert_eq!(status, StatusCode::OK);
    acknowledged(&body);
    assert_eq!(shop.order(&created.order.order_id).await.status, OrderStatusType::Failed);

    // A payment confirmation that arrives after the order has failed is acknowledged and ignored
    let (status, body) = shop.notify_status(&created.session.id, "paid").await;
    assert_eq!(status, StatusCode::OK);
    acknowledged(&body);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(shop.order(&created.order.order_id).await.status, OrderStatusType::Failed);
    assert_eq!(shop.provider.calls(), 0);
}

#[actix_web::test]
async fn store_outage_asks_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let provider = FakeProvider::new();
    let body = FakeGateway::notification("session-1", "paid");
    let headers = [(PAYMENT_SIGNATURE_HEADER, FAKE_SIGNATURE)];
    let (status, _) = post_request("/payment", &headers, body, |cfg| {
        let mut store = MockStore::new();
        store
            .expect_fetch_order_by_session_id()
            .returning(|_| Err(OrderStoreError::DatabaseError("database is locked".into())));
        store.expect_transition_status().never();
        let api =
            FulfillmentApi::new(store, FakeGateway::new(), provider.clone(), FakeNotifier::new(), Catalog::default())
                .with_options(test_options());
        cfg.app_data(web::Data::new(api))
            .service(PaymentWebhookRoute::<MockStore, FakeGateway, FakeProvider, FakeNotifier>::new());
    })
    .await
    .expect("Failed to make request");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(provider.calls(), 0);
}
