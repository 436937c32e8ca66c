use std::{net::IpAddr, time::Duration};

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use coingate_tools::CoinGateApi;
use futures::{future::ok, FutureExt};
use giftcard_engine::{
    catalog::Catalog,
    events::EventProducers,
    traits::StaticExchangeRates,
    FulfillmentApi,
    OrderApi,
    SqliteDatabase,
};
use log::*;
use tango_tools::TangoApi;

use crate::{
    auth::AdminAuth,
    config::ServerConfig,
    errors::{AuthError, ServerError},
    helpers::get_remote_ip,
    hooks::{logging_hooks, start_event_handlers},
    integrations::{CoinGateGateway, MailRelayNotifier, TangoProvider},
    recovery_worker::start_recovery_worker,
    routes::{
        health,
        AdminOrdersRoute,
        AdminResendRoute,
        AdminResumeRoute,
        CreateOrderRoute,
        CryptoRatesRoute,
        OrderByIdRoute,
        PaymentWebhookRoute,
    },
};

const DB_MAX_CONNECTIONS: u32 = 25;

/// The collaborators every worker's APIs are built from
#[derive(Clone)]
pub struct Backends {
    pub db: SqliteDatabase,
    pub gateway: CoinGateGateway,
    pub provider: TangoProvider,
    pub notifier: MailRelayNotifier,
    pub rates: StaticExchangeRates,
    pub catalog: Catalog,
}

impl Backends {
    pub fn order_api(&self) -> OrderApi<SqliteDatabase, CoinGateGateway, StaticExchangeRates> {
        OrderApi::new(self.db.clone(), self.gateway.clone(), self.rates.clone(), self.catalog.clone())
    }

    pub fn fulfillment_api(
        &self,
        config: &ServerConfig,
        producers: EventProducers,
    ) -> FulfillmentApi<SqliteDatabase, CoinGateGateway, TangoProvider, MailRelayNotifier> {
        FulfillmentApi::new(
            self.db.clone(),
            self.gateway.clone(),
            self.provider.clone(),
            self.notifier.clone(),
            self.catalog.clone(),
        )
        .with_options(config.fulfillment)
        .with_producers(producers)
    }
}

pub fn load_catalog(config: &ServerConfig) -> Result<Catalog, ServerError> {
    match &config.catalog_file {
        Some(path) => Catalog::from_json_file(path).map_err(|e| ServerError::ConfigurationError(e.to_string())),
        None => {
            info!("🪛️ Using the built-in gift card catalog");
            Ok(Catalog::default())
        },
    }
}

/// Makes sure the directory holding a file-backed SQLite database exists
fn ensure_db_dir(url: &str) {
    let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) else {
        return;
    };
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return;
    }
    if let Some(parent) = std::path::Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("🗃️ Could not create the database directory {}. {e}", parent.display());
        }
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    ensure_db_dir(&config.database_url);
    let db = SqliteDatabase::create_and_migrate(&config.database_url, DB_MAX_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let catalog = load_catalog(&config)?;
    let coingate = CoinGateApi::new(config.coingate.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let tango = TangoApi::new(config.tango.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let backends = Backends {
        db,
        gateway: CoinGateGateway::new(coingate),
        provider: TangoProvider::new(tango, catalog.clone()),
        notifier: MailRelayNotifier::new(config.mail.clone())?,
        rates: config.exchange_rates(),
        catalog,
    };
    let producers = start_event_handlers(logging_hooks()).await;
    let _worker = start_recovery_worker(
        backends.fulfillment_api(&config, producers.clone()),
        config.recovery_interval,
        config.stalled_order_age,
    );
    let srv = create_server_instance(config, backends, producers)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

/// True if the payment callback may proceed. With no whitelist configured, every caller is allowed.
pub fn is_whitelisted(peer_ip: Option<IpAddr>, whitelist: &Option<Vec<IpAddr>>) -> bool {
    match (peer_ip, whitelist) {
        (_, None) => true,
        (Some(ip), Some(whitelist)) => {
            debug!("💻️ Payment callback from {ip}");
            whitelist.contains(&ip)
        },
        (None, Some(_)) => {
            warn!("💻️ No IP address found in payment callback request, denying access.");
            false
        },
    }
}

pub fn create_server_instance(
    config: ServerConfig,
    backends: Backends,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let order_api = backends.order_api();
        let fulfillment_api = backends.fulfillment_api(&config, producers.clone());
        let admin_auth = AdminAuth::new(config.admin_token.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("gcm::access_log"))
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(fulfillment_api))
            .app_data(web::Data::new(admin_auth));
        let use_x_forwarded_for = config.use_x_forwarded_for;
        let use_forwarded = config.use_forwarded;
        let whitelist = config.webhook_whitelist.clone();
        let webhook_scope = web::scope("/webhook")
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
                if is_whitelisted(peer_ip, &whitelist) {
                    srv.call(req)
                } else {
                    let peer = peer_ip.map(|ip| ip.to_string()).unwrap_or_else(|| "an unknown address".into());
                    ok(req.error_response(ServerError::AuthenticationError(AuthError::IpNotAllowed(peer))))
                        .boxed_local()
                }
            })
            .service(PaymentWebhookRoute::<SqliteDatabase, CoinGateGateway, TangoProvider, MailRelayNotifier>::new());
        let api_scope = web::scope("/api")
            .service(webhook_scope)
            .service(CryptoRatesRoute::<SqliteDatabase, CoinGateGateway, StaticExchangeRates>::new())
            .service(CreateOrderRoute::<SqliteDatabase, CoinGateGateway, StaticExchangeRates>::new())
            .service(OrderByIdRoute::<SqliteDatabase, CoinGateGateway, StaticExchangeRates>::new());
        let admin_scope = web::scope("/admin")
            .service(AdminOrdersRoute::<SqliteDatabase, CoinGateGateway, StaticExchangeRates>::new())
            .service(AdminResendRoute::<SqliteDatabase, CoinGateGateway, TangoProvider, MailRelayNotifier>::new())
            .service(AdminResumeRoute::<SqliteDatabase, CoinGateGateway, TangoProvider, MailRelayNotifier>::new());
        app.service(health).service(api_scope).service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
