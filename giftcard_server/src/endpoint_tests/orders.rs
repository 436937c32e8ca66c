use std::collections::BTreeMap;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use giftcard_engine::{
    catalog::Catalog,
    db_types::{Cents, LineItem, NewOrder, Order, OrderId, OrderStatusType, PaymentMethod},
    test_utils::fakes::FakeGateway,
    traits::{ExchangeRate, OrderStoreError},
    OrderApi,
};
use log::*;
use rust_decimal::Decimal;

use super::{
    helpers::{get_request, post_request},
    mocks::{MockRates, MockStore},
};
use crate::{
    data_objects::{CreateOrderResponse, OrderView},
    routes::{CreateOrderRoute, CryptoRatesRoute, OrderByIdRoute},
};

const NEW_ORDER: &str = r#"{
    "items": [{"brand": "Amazon", "value": 25}, {"brand": "Steam", "value": "10.00"}],
    "paymentMethod": "bitcoin",
    "email": "buyer@example.com"
}"#;

fn register(cfg: &mut ServiceConfig, store: MockStore, gateway: FakeGateway, rates: MockRates) {
    let api = OrderApi::new(store, gateway, rates, Catalog::default());
    cfg.app_data(web::Data::new(api))
        .service(CryptoRatesRoute::<MockStore, FakeGateway, MockRates>::new())
        .service(CreateOrderRoute::<MockStore, FakeGateway, MockRates>::new())
        .service(OrderByIdRoute::<MockStore, FakeGateway, MockRates>::new());
}

fn stored(order: NewOrder) -> Order {
    let total = order.total();
    Order {
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
    }
}

fn completed_order() -> Order {
    let mut item = LineItem::new("Amazon", Cents::from_dollars(25));
    item.code = Some("AMZN-CODE-0001".into());
    item.pin = Some("1234".into());
    let now = Utc::now();
    Order {
        order_id: OrderId::from("ORD-1"),
        items: vec![item],
        total: Cents::from_dollars(25),
        payment_method: PaymentMethod::Ethereum,
        crypto_amount: Decimal::new(83333333, 10),
        receive_address: Some("0xfeed".into()),
        payment_url: "https://pay.example.com/invoice/1".into(),
        buyer_contact: "buyer@example.com".into(),
        status: OrderStatusType::Completed,
        provider_session_id: "session-1".into(),
        created_at: now,
        updated_at: now,
        delivered_at: Some(now),
        delivery_error: None,
    }
}

#[actix_web::test]
async fn crypto_rates() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/crypto-rates", &[], |cfg| {
        let mut rates = MockRates::new();
        rates.expect_fetch_all_rates().returning(|| {
            Ok(vec![
                ExchangeRate::new(PaymentMethod::Bitcoin, Decimal::from(50_000)),
                ExchangeRate::new(PaymentMethod::Litecoin, Decimal::from(95)),
            ])
        });
        register(cfg, MockStore::new(), FakeGateway::new(), rates);
    })
    .await
    .expect("Failed to make request");
    assert_eq!(status, StatusCode::OK);
    let rates: BTreeMap<String, Decimal> = serde_json::from_str(&body).unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates["bitcoin"], Decimal::from(50_000));
    assert_eq!(rates["litecoin"], Decimal::from(95));
}

#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init().ok();
    let gateway = FakeGateway::new();
    let sessions = gateway.clone();
    let (status, body) = post_request("/orders", &[("Content-Type", "application/json")], NEW_ORDER.into(), |cfg| {
        let mut rates = MockRates::new();
        rates
            .expect_fetch_last_rate()
            .times(1)
            .returning(|method| Ok(ExchangeRate::new(method, Decimal::from(50_000))));
        let mut store = MockStore::new();
        store.expect_insert_order().times(1).returning(|order| {
            assert_eq!(order.items.len(), 2);
            assert_eq!(order.provider_session_id, "session-1");
            Ok(stored(order))
        });
        register(cfg, store, gateway, rates);
    })
    .await
    .expect("Failed to make request");
    info!("Response body: {body}");
    assert_eq!(status, StatusCode::OK);
    let response: CreateOrderResponse = serde_json::from_str(&body).unwrap();
    assert!(response.order_id.starts_with("ORD-"));
    assert_eq!(response.payment_url, "https://pay.example.com/invoice/1");
    assert_eq!(response.wallet_address.as_deref(), Some("bc1qfake0001"));
    assert_eq!(response.total, Decimal::from(35));
    assert_eq!(response.crypto_amount, Decimal::new(7, 4));
    let requests = sessions.session_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].price, Cents::from_dollars(35));
    assert_eq!(requests[0].receive_currency, PaymentMethod::Bitcoin);
}

#[actix_web::test]
async fn create_order_with_unknown_brand() {
    let _ = env_logger::try_init().ok();
    let gateway = FakeGateway::new();
    let sessions = gateway.clone();
    let body = r#"{"items":[{"brand":"Blockbuster","value":25}],"paymentMethod":"btc","email":"buyer@example.com"}"#;
    let (status, body) = post_request("/orders", &[("Content-Type", "application/json")], body.into(), |cfg| {
        let mut rates = MockRates::new();
        rates.expect_fetch_last_rate().never();
        let mut store = MockStore::new();
        store.expect_insert_order().never();
        register(cfg, store, gateway, rates);
    })
    .await
    .expect("Failed to make request");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Blockbuster"), "was: {body}");
    assert!(sessions.session_requests().is_empty());
}

#[actix_web::test]
async fn create_order_with_bad_request_fields() {
    let _ = env_logger::try_init().ok();
    let bodies = [
        r#"{"items":[{"brand":"Amazon","value":25}],"paymentMethod":"dogecoin","email":"buyer@example.com"}"#,
        r#"{"items":[{"brand":"Amazon","value":25.005}],"paymentMethod":"btc","email":"buyer@example.com"}"#,
        r#"{"items":[],"paymentMethod":"btc","email":"buyer@example.com"}"#,
        r#"{"items":[{"brand":"Amazon","value":25}],"paymentMethod":"btc","email":"not an email"}"#,
        r#"{"paymentMethod":"btc"}"#,
        r#"{"items":[{"brand":"Amazon","value":"79228162514264337593543950335"}],"paymentMethod":"btc","email":"buyer@example.com"}"#,
        r#"{"items":[{"brand":"Amazon","value":1e28}],"paymentMethod":"btc","email":"buyer@example.com"}"#,
    ];
    for body in bodies {
        let (status, response) = post_request("/orders", &[("Content-Type", "application/json")], body.into(), |cfg| {
            let mut store = MockStore::new();
            store.expect_insert_order().never();
            register(cfg, store, FakeGateway::new(), MockRates::new());
        })
        .await
        .expect("Failed to make request");
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body} gave {response}");
    }
}

#[actix_web::test]
async fn create_order_with_an_oversized_value() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"items":[{"brand":"Amazon","value":"79228162514264337593543950335"}],"paymentMethod":"btc","email":"buyer@example.com"}"#;
    let (status, response) = post_request("/orders", &[("Content-Type", "application/json")], body.into(), |cfg| {
        let mut store = MockStore::new();
        store.expect_insert_order().never();
        register(cfg, store, FakeGateway::new(), MockRates::new());
    })
    .await
    .expect("Failed to make request");
    assert_eq!(status, StatusCode::BAD_REQUEST, "was: {response}");
    assert!(response.contains("too large"), "was: {response}");
}

#[actix_web::test]
async fn create_order_when_gateway_is_down() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/orders", &[("Content-Type", "application/json")], NEW_ORDER.into(), |cfg| {
        let mut rates = MockRates::new();
        rates.expect_fetch_last_rate().returning(|method| Ok(ExchangeRate::new(method, Decimal::from(50_000))));
        let mut store = MockStore::new();
        store.expect_insert_order().never();
        register(cfg, store, FakeGateway::unavailable(), rates);
    })
    .await
    .expect("Failed to make request");
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("error"), "was: {body}");
}

#[actix_web::test]
async fn fetch_order_by_id() {
    let _ = env_logger::try_init().ok();
    let configure = |cfg: &mut ServiceConfig| {
        let mut store = MockStore::new();
        store.expect_fetch_order().returning(|id| Ok((id.as_str() == "ORD-1").then(completed_order)));
        register(cfg, store, FakeGateway::new(), MockRates::new());
    };
    let (status, body) = get_request("/orders/ORD-1", &[], configure).await.expect("Failed to make request");
    assert_eq!(status, StatusCode::OK);
    let order: OrderView = serde_json::from_str(&body).unwrap();
    assert_eq!(order.status, OrderStatusType::Completed);
    assert_eq!(order.email, "buyer@example.com");
    assert_eq!(order.items[0].code.as_deref(), Some("AMZN-CODE-0001"));
    assert_eq!(order.items[0].value, Decimal::from(25));

    let (status, body) = get_request("/orders/ORD-2", &[], configure).await.expect("Failed to make request");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("ORD-2"), "was: {body}");
}

#[actix_web::test]
async fn fetch_order_when_store_is_down() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request("/orders/ORD-1", &[], |cfg| {
        let mut store = MockStore::new();
        store.expect_fetch_order().returning(|_| Err(OrderStoreError::DatabaseError("disk I/O error".into())));
        register(cfg, store, FakeGateway::new(), MockRates::new());
    })
    .await
    .expect("Failed to make request");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
