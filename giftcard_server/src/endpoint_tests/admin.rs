use actix_web::{http::StatusCode, web, web::ServiceConfig};
use gcm_common::Secret;
use giftcard_engine::{
    catalog::Catalog,
    db_types::{Cents, OrderId, OrderStatusType, PaymentMethod},
    order_objects::{CreatedOrder, FulfillmentResult, ItemRequest, NewOrderRequest, NotificationOutcome},
    test_utils::fakes::{FakeGateway, FakeNotifier, FakeProvider, FAKE_SIGNATURE},
    traits::{OrderStore, StaticExchangeRates},
    FulfillmentApi,
    GiftCardNotifier,
    GiftCardProvider,
    InMemoryOrderStore,
    OrderApi,
};

use super::{
    helpers::{fulfillment_api, get_request, post_request, test_options},
    mocks::{MockNotifier, MockProvider},
};
use crate::{
    auth::{AdminAuth, ADMIN_TOKEN_HEADER},
    data_objects::{JsonResponse, OrderView},
    routes::{AdminOrdersRoute, AdminResendRoute, AdminResumeRoute},
};

const TOKEN: &str = "letmein";

fn register<P, N>(cfg: &mut ServiceConfig, token: &str, store: InMemoryOrderStore, provider: P, notifier: N)
where
    P: GiftCardProvider + 'static,
    N: GiftCardNotifier + 'static,
{
    let gateway = FakeGateway::new();
    let orders = OrderApi::new(store.clone(), gateway.clone(), StaticExchangeRates::default(), Catalog::default());
    let fulfillment =
        FulfillmentApi::new(store, gateway, provider, notifier, Catalog::default()).with_options(test_options());
    cfg.app_data(web::Data::new(orders))
        .app_data(web::Data::new(fulfillment))
        .app_data(web::Data::new(AdminAuth::new(Secret::new(token.to_string()))))
        .service(
            web::scope("/admin")
                .service(AdminOrdersRoute::<InMemoryOrderStore, FakeGateway, StaticExchangeRates>::new())
                .service(AdminResendRoute::<InMemoryOrderStore, FakeGateway, P, N>::new())
                .service(AdminResumeRoute::<InMemoryOrderStore, FakeGateway, P, N>::new()),
        );
}

/// A store with some orders in it, and the collaborators that put them there
struct Fixture {
    store: InMemoryOrderStore,
    gateway: FakeGateway,
    provider: FakeProvider,
    notifier: FakeNotifier,
}

impl Fixture {
    fn new() -> Self {
        let _ = env_logger::try_init().ok();
        Self::with_notifier(FakeNotifier::new())
    }

    fn with_notifier(notifier: FakeNotifier) -> Self {
        Self { store: InMemoryOrderStore::new(), gateway: FakeGateway::new(), provider: FakeProvider::new(), notifier }
    }

    async fn create_order(&self, email: &str) -> CreatedOrder {
        let rates = StaticExchangeRates::default();
        let api = OrderApi::new(self.store.clone(), self.gateway.clone(), rates, Catalog::default());
        let request = NewOrderRequest {
            items: vec![
                ItemRequest::new("Apple", Cents::from_dollars(50)),
                ItemRequest::new("Netflix", Cents::from_dollars(25)),
            ],
            payment_method: PaymentMethod::Ethereum,
            buyer_contact: email.into(),
        };
        api.create_order(request).await.expect("order creation failed")
    }

    /// Confirms payment without fulfilling the order
    async fn mark_paid(&self, created: &CreatedOrder) {
        let api = fulfillment_api(&self.store, &self.gateway, &self.provider, &self.notifier);
        let body = FakeGateway::notification(&created.session.id, "paid");
        let outcome = api.accept_notification(&body, Some(FAKE_SIGNATURE)).await.unwrap();
        assert_eq!(outcome, NotificationOutcome::Paid(created.order.order_id.clone()));
    }

    async fn complete(&self, created: &CreatedOrder) {
        self.mark_paid(created).await;
        let api = fulfillment_api(&self.store, &self.gateway, &self.provider, &self.notifier);
        let result = api.fulfill_order(&created.order.order_id).await.unwrap();
        assert!(matches!(result, FulfillmentResult::Completed { .. }));
    }

    async fn status(&self, order_id: &OrderId) -> OrderStatusType {
        self.store.fetch_order(order_id).await.unwrap().unwrap().status
    }

    fn configure(&self, token: &str) -> impl FnOnce(&mut ServiceConfig) {
        let (store, provider, notifier) = (self.store.clone(), self.provider.clone(), self.notifier.clone());
        let token = token.to_string();
        move |cfg: &mut ServiceConfig| register(cfg, &token, store, provider, notifier)
    }
}

#[actix_web::test]
async fn admin_routes_need_a_token() {
    let fixture = Fixture::new();
    let (status, body) = get_request("/admin/orders", &[], fixture.configure(TOKEN)).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED, "was: {body}");

    let headers = [(ADMIN_TOKEN_HEADER, "letmeout")];
    let (status, _) = get_request("/admin/orders", &headers, fixture.configure(TOKEN)).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    let path = "/admin/orders/ORD-1/resend";
    let (status, _) = post_request(path, &headers, vec![], fixture.configure(TOKEN)).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = post_request("/admin/orders/ORD-1/resume", &[], vec![], fixture.configure(TOKEN)).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_is_disabled_without_a_configured_token() {
    let fixture = Fixture::new();
    let headers = [(ADMIN_TOKEN_HEADER, "")];
    let (status, _) = get_request("/admin/orders", &headers, fixture.configure("")).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    let headers = [(ADMIN_TOKEN_HEADER, "anything")];
    let (status, _) = get_request("/admin/orders", &headers, fixture.configure("")).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn search_orders() {
    let fixture = Fixture::new();
    let alice = fixture.create_order("alice@example.com").await;
    let _bob = fixture.create_order("bob@example.com").await;
    fixture.mark_paid(&alice).await;
    let headers = [(ADMIN_TOKEN_HEADER, TOKEN)];

    let search = |query: &str| {
        let path = format!("/admin/orders{query}");
        let configure = fixture.configure(TOKEN);
        async move {
            let (status, body) = get_request(&path, &headers, configure).await.unwrap();
            assert_eq!(status, StatusCode::OK, "was: {body}");
            serde_json::from_str::<Vec<OrderView>>(&body).unwrap()
        }
    };
    assert_eq!(search("").await.len(), 2);
    let paid = search("?status=paid").await;
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].order_id, alice.order.order_id.to_string());
    assert_eq!(search("?status=pending,paid").await.len(), 2);
    assert_eq!(search("?status=completed").await.len(), 0);
    let bobs = search("?email=bob@example.com").await;
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].email, "bob@example.com");
    assert_eq!(search("?updated_before=2000-01-01T00:00:00Z").await.len(), 0);

    let (status, _) = get_request("/admin/orders?status=lost", &headers, fixture.configure(TOKEN)).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn resend_codes_of_a_completed_order() {
    let fixture = Fixture::new();
    let created = fixture.create_order("alice@example.com").await;
    fixture.complete(&created).await;
    assert_eq!(fixture.notifier.deliveries().len(), 1);

    let path = format!("/admin/orders/{}/resend", created.order.order_id);
    let headers = [(ADMIN_TOKEN_HEADER, TOKEN)];
    let (status, body) = post_request(&path, &headers, vec![], |cfg| {
        let mut provider = MockProvider::new();
        provider.expect_purchase_card().never();
        let mut notifier = MockNotifier::new();
        notifier.expect_deliver().times(1).returning(|recipient, summary| {
            assert_eq!(recipient, "alice@example.com");
            assert_eq!(summary.cards.len(), 2);
            Ok(())
        });
        register(cfg, TOKEN, fixture.store.clone(), provider, notifier);
    })
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK, "was: {body}");
    let order: OrderView = serde_json::from_str(&body).unwrap();
    assert_eq!(order.status, OrderStatusType::Completed);
    assert!(order.delivered_at.is_some());
    assert_eq!(fixture.provider.calls(), 2);
}

#[actix_web::test]
async fn resend_codes_needs_a_completed_order() {
    let fixture = Fixture::new();
    let created = fixture.create_order("alice@example.com").await;
    let headers = [(ADMIN_TOKEN_HEADER, TOKEN)];
    let path = format!("/admin/orders/{}/resend", created.order.order_id);
    let (status, body) = post_request(&path, &headers, vec![], fixture.configure(TOKEN)).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT, "was: {body}");
    assert!(fixture.notifier.deliveries().is_empty());

    let path = "/admin/orders/ORD-404/resend";
    let (status, _) = post_request(path, &headers, vec![], fixture.configure(TOKEN)).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn failed_resend_leaves_the_order_completed() {
    let _ = env_logger::try_init().ok();
    let fixture = Fixture::with_notifier(FakeNotifier::failing());
    let created = fixture.create_order("alice@example.com").await;
    fixture.complete(&created).await;
    let order_id = created.order.order_id.clone();
    assert_eq!(fixture.status(&order_id).await, OrderStatusType::Completed);

    let path = format!("/admin/orders/{order_id}/resend");
    let headers = [(ADMIN_TOKEN_HEADER, TOKEN)];
    let (status, _) = post_request(&path, &headers, vec![], fixture.configure(TOKEN)).await.unwrap();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(fixture.status(&order_id).await, OrderStatusType::Completed);
    assert_eq!(fixture.provider.calls(), 2);
}

#[actix_web::test]
async fn resume_a_paid_order() {
    let fixture = Fixture::new();
    let created = fixture.create_order("alice@example.com").await;
    let order_id = created.order.order_id.clone();
    let headers = [(ADMIN_TOKEN_HEADER, TOKEN)];
    let path = format!("/admin/orders/{order_id}/resume");

    // Nothing to resume until payment is confirmed
    let (status, body) = post_request(&path, &headers, vec![], fixture.configure(TOKEN)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(!response.success, "was: {body}");
    assert_eq!(fixture.status(&order_id).await, OrderStatusType::Pending);

    fixture.mark_paid(&created).await;
    let (status, body) = post_request(&path, &headers, vec![], fixture.configure(TOKEN)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success, "was: {body}");
    assert_eq!(fixture.status(&order_id).await, OrderStatusType::Completed);
    assert_eq!(fixture.provider.cards_issued(), 2);
    assert_eq!(fixture.notifier.deliveries().len(), 1);
}
