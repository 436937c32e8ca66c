use std::time::Duration;

use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use giftcard_engine::{
    catalog::Catalog,
    helpers::RetryPolicy,
    order_objects::FulfillmentOptions,
    test_utils::fakes::{FakeGateway, FakeNotifier, FakeProvider},
    FulfillmentApi,
    InMemoryOrderStore,
};
use log::debug;

pub type TestFulfillmentApi = FulfillmentApi<InMemoryOrderStore, FakeGateway, FakeProvider, FakeNotifier>;

pub fn test_options() -> FulfillmentOptions {
    FulfillmentOptions {
        max_concurrent_purchases: 2,
        purchase_retry: RetryPolicy::immediate(2, Duration::from_millis(200)),
        delivery_retry: RetryPolicy::immediate(2, Duration::from_millis(200)),
        resume_after: Duration::ZERO,
    }
}

pub fn fulfillment_api(
    store: &InMemoryOrderStore,
    gateway: &FakeGateway,
    provider: &FakeProvider,
    notifier: &FakeNotifier,
) -> TestFulfillmentApi {
    FulfillmentApi::new(store.clone(), gateway.clone(), provider.clone(), notifier.clone(), Catalog::default())
        .with_options(test_options())
}

pub async fn get_request(
    path: &str,
    headers: &[(&str, &str)],
    configure: impl FnOnce(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::get().uri(path);
    for (name, value) in headers {
        req = req.insert_header((*name, *value));
    }
    send(req, configure).await
}

pub async fn post_request(
    path: &str,
    headers: &[(&str, &str)],
    body: Vec<u8>,
    configure: impl FnOnce(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let mut req = TestRequest::post().uri(path).set_payload(body);
    for (name, value) in headers {
        req = req.insert_header((*name, *value));
    }
    send(req, configure).await
}

async fn send(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}
