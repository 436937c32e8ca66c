//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (e.g. I/O, database operations,
//! gift card purchases) must be expressed as futures. Fulfillment in particular is never awaited inside the payment
//! webhook handler; it is spawned onto the worker's runtime once the notification has been acknowledged.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use giftcard_engine::{
    db_types::OrderId,
    order_objects::{FulfillmentResult, NewOrderRequest, NotificationOutcome},
    traits::{ExchangeRates, OrderQueryFilter},
    FulfillmentApi,
    GiftCardNotifier,
    GiftCardProvider,
    OrderApi,
    OrderStore,
    PaymentGateway,
};
use log::*;

use crate::{
    auth::Admin,
    data_objects::{rates_map, AdminOrderQuery, CreateOrderRequest, CreateOrderResponse, JsonResponse, OrderView},
    errors::ServerError,
};

/// The header that carries the payment callback signature
pub const PAYMENT_SIGNATURE_HEADER: &str = coingate_tools::SIGNATURE_HEADER;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Storefront  ----------------------------------------------------
route!(crypto_rates => Get "/crypto-rates" impl OrderStore, PaymentGateway, ExchangeRates);
/// The USD price of one unit of each accepted currency, keyed by payment method.
pub async fn crypto_rates<B, G, X>(api: web::Data<OrderApi<B, G, X>>) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
    X: ExchangeRates,
{
    trace!("💻️ Received crypto rates request");
    let rates = api.crypto_rates().await?;
    Ok(HttpResponse::Ok().json(rates_map(rates)))
}

route!(create_order => Post "/orders" impl OrderStore, PaymentGateway, ExchangeRates);
/// Creates a `pending` order and opens a payment session for it.
///
/// The body is a JSON object with the buyer's `items` (each a `brand` and a dollar `value`), the `paymentMethod`
/// (`bitcoin`, `ethereum` or `litecoin`) and the buyer's `email`. The response carries the order id, the crypto amount
/// to pay and where to pay it.
///
/// Invalid items or contact details give a 400. If the payment processor cannot open a session, nothing is stored and
/// the response is a 502.
pub async fn create_order<B, G, X>(
    api: web::Data<OrderApi<B, G, X>>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
    X: ExchangeRates,
{
    trace!("💻️ Received new order request");
    let request = NewOrderRequest::try_from(body.into_inner())?;
    let created = api.create_order(request).await.map_err(|e| {
        warn!("💻️ Could not create order. {e}");
        ServerError::from(e)
    })?;
    info!("💻️ Order {} created. Awaiting payment at {}", created.order.order_id, created.session.pay_url);
    Ok(HttpResponse::Ok().json(CreateOrderResponse::from(created)))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderStore, PaymentGateway, ExchangeRates);
pub async fn order_by_id<B, G, X>(
    path: web::Path<String>,
    api: web::Data<OrderApi<B, G, X>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
    X: ExchangeRates,
{
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ Received order request for {order_id}");
    let order = api
        .fetch_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(OrderView::from(order)))
}

//----------------------------------------------   Payment webhook  ----------------------------------------------------
route!(payment_webhook => Post "/payment" impl OrderStore, PaymentGateway, GiftCardProvider, GiftCardNotifier);
/// Receives payment status callbacks from the payment processor.
///
/// The raw body is authenticated before anything in it is trusted. Unsigned, mis-signed or unparseable callbacks get a
/// 400. Every authenticated callback is acknowledged with a 200, including duplicates, out-of-order statuses and
/// callbacks for sessions we don't know about, so that the processor stops retrying them. The only other response
/// is a 500 when the order store is unreachable, which asks the processor to try again later.
///
/// When a callback confirms payment, fulfillment is started in the background after this handler returns.
pub async fn payment_webhook<B, G, P, N>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<FulfillmentApi<B, G, P, N>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: GiftCardProvider + 'static,
    N: GiftCardNotifier + 'static,
{
    trace!("💻️ Received payment callback ({} bytes)", body.len());
    let signature = req.headers().get(PAYMENT_SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let outcome = api.accept_notification(&body, signature).await.map_err(|e| {
        if e.is_bad_notification() {
            warn!("💻️ Rejected payment callback. {e}");
        } else {
            error!("💻️ Could not process payment callback. {e}");
        }
        ServerError::from(e)
    })?;
    let message = outcome.message();
    if let NotificationOutcome::Paid(order_id) = outcome {
        let api = api.clone();
        actix_web::rt::spawn(async move {
            match api.fulfill_order(&order_id).await {
                Ok(result) => info!("💻️ Fulfillment of order {order_id} finished. {}", describe_result(&result)),
                Err(e) => error!("💻️ Fulfillment of order {order_id} did not finish. {e}"),
            }
        });
    }
    debug!("💻️ Payment callback handled. {message}");
    Ok(HttpResponse::Ok().json(JsonResponse::success(message)))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(admin_orders => Get "/orders" impl OrderStore, PaymentGateway, ExchangeRates);
/// Searches orders. The query string accepts `status` (comma-separated), `email` and `updated_before` (RFC 3339).
/// With no filters, every order is returned.
pub async fn admin_orders<B, G, X>(
    _admin: Admin,
    query: web::Query<AdminOrderQuery>,
    api: web::Data<OrderApi<B, G, X>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
    X: ExchangeRates,
{
    let filter = OrderQueryFilter::try_from(query.into_inner())?;
    debug!("💻️ Admin order search: {filter:?}");
    let orders = api.search_orders(filter).await?;
    let orders = orders.into_iter().map(OrderView::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(orders))
}

route!(admin_resend => Post "/orders/{order_id}/resend" impl OrderStore, PaymentGateway, GiftCardProvider, GiftCardNotifier);
/// Emails the codes of a completed order to the buyer again. No new gift cards are bought.
pub async fn admin_resend<B, G, P, N>(
    _admin: Admin,
    path: web::Path<String>,
    api: web::Data<FulfillmentApi<B, G, P, N>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
    P: GiftCardProvider,
    N: GiftCardNotifier,
{
    let order_id = OrderId::from(path.into_inner());
    info!("💻️ Admin requested that the codes for order {order_id} be re-sent");
    let order = api.resend_codes(&order_id).await?;
    Ok(HttpResponse::Ok().json(OrderView::from(order)))
}

route!(admin_resume => Post "/orders/{order_id}/resume" impl OrderStore, PaymentGateway, GiftCardProvider, GiftCardNotifier);
/// Re-drives a `paid` or `processing` order whose fulfillment stalled. Items that already have a code are left alone.
/// A `processing` order that was updated recently may still be in flight, and is reported as not resumed.
pub async fn admin_resume<B, G, P, N>(
    _admin: Admin,
    path: web::Path<String>,
    api: web::Data<FulfillmentApi<B, G, P, N>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderStore,
    G: PaymentGateway,
    P: GiftCardProvider,
    N: GiftCardNotifier,
{
    let order_id = OrderId::from(path.into_inner());
    info!("💻️ Admin requested that order {order_id} be resumed");
    let result = api.resume_order(&order_id).await?;
    let response = match result {
        FulfillmentResult::NotStarted(_) => JsonResponse::failure(describe_result(&result)),
        _ => JsonResponse::success(describe_result(&result)),
    };
    Ok(HttpResponse::Ok().json(response))
}

pub fn describe_result(result: &FulfillmentResult) -> String {
    match result {
        FulfillmentResult::Completed { delivered: true } => "The order is complete and the codes were delivered.".into(),
        FulfillmentResult::Completed { delivered: false } => {
            "The order is complete, but the codes could not be delivered. They can be re-sent.".into()
        },
        FulfillmentResult::Failed { failed_items } => {
            let items = failed_items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
            format!("The order failed. These items could not be fulfilled: {items}")
        },
        FulfillmentResult::NotStarted(status) => format!("The order is {status}, so fulfillment was not started."),
    }
}
