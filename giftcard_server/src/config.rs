use std::{env, net::IpAddr, time::Duration};

use coingate_tools::CoinGateConfig;
use gcm_common::{
    helpers::{parse_boolean_flag, parse_env_var, split_list},
    Secret,
};
use giftcard_engine::{
    db_types::PaymentMethod,
    helpers::RetryPolicy,
    order_objects::{FulfillmentOptions, DEFAULT_MAX_CONCURRENT_PURCHASES},
    traits::StaticExchangeRates,
};
use log::*;
use rust_decimal::Decimal;
use tango_tools::TangoConfig;

const DEFAULT_GCM_HOST: &str = "127.0.0.1";
const DEFAULT_GCM_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/giftcards.db";
const DEFAULT_RECOVERY_INTERVAL: Duration = Duration::from_secs(300);
const DEFAULT_STALLED_ORDER_AGE: Duration = Duration::from_secs(600);
pub const DEFAULT_MAIL_SUBJECT: &str = "Your Gift Cards Are Here!";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// If supplied, payment callbacks are only accepted from these addresses.
    pub webhook_whitelist: Option<Vec<IpAddr>>,
    /// The value callers must supply in the `X-Admin-Token` header. Admin routes are disabled when this is empty.
    pub admin_token: Secret<String>,
    /// Path to a JSON brand catalog. The built-in catalog is used when not set.
    pub catalog_file: Option<String>,
    /// USD price of one unit of each accepted currency
    pub exchange_rates: Vec<(PaymentMethod, Decimal)>,
    pub fulfillment: FulfillmentOptions,
    /// How often the recovery worker looks for stalled orders
    pub recovery_interval: Duration,
    /// How long a `paid` or `processing` order may sit untouched before it is considered stalled
    pub stalled_order_age: Duration,
    pub coingate: CoinGateConfig,
    pub tango: TangoConfig,
    pub mail: MailConfig,
}

#[derive(Clone, Debug, Default)]
pub struct MailConfig {
    /// The HTTP mail relay endpoint. Deliveries fail (and can be re-sent later) when this is not set.
    pub relay_url: Option<String>,
    pub api_key: Secret<String>,
    pub from: String,
    pub subject: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GCM_HOST.to_string(),
            port: DEFAULT_GCM_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            webhook_whitelist: None,
            admin_token: Secret::default(),
            catalog_file: None,
            exchange_rates: default_exchange_rates(),
            fulfillment: FulfillmentOptions::default(),
            recovery_interval: DEFAULT_RECOVERY_INTERVAL,
            stalled_order_age: DEFAULT_STALLED_ORDER_AGE,
            coingate: CoinGateConfig::default(),
            tango: TangoConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

fn default_exchange_rates() -> Vec<(PaymentMethod, Decimal)> {
    vec![
        (PaymentMethod::Bitcoin, Decimal::from(45_000)),
        (PaymentMethod::Ethereum, Decimal::from(3_000)),
        (PaymentMethod::Litecoin, Decimal::from(120)),
    ]
}

/// Reads `key`, logging and falling back to `default` if the value is missing or cannot be parsed.
fn env_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match parse_env_var::<T>(key) {
        Ok(Some(v)) => v,
        Ok(None) => default,
        Err(e) => {
            error!("🪛️ {e}. Using the default, {default:?}, instead.");
            default
        },
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    parse_boolean_flag(env::var(key).ok(), default)
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("GCM_HOST").ok().unwrap_or_else(|| DEFAULT_GCM_HOST.into());
        let port = env_or_default("GCM_PORT", DEFAULT_GCM_PORT);
        let database_url = env::var("GCM_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ GCM_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let use_x_forwarded_for = env_flag("GCM_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("GCM_USE_FORWARDED", false);
        let webhook_whitelist = configure_webhook_whitelist(env::var("GCM_WEBHOOK_WHITELIST").ok());
        let admin_token = Secret::new(env::var("GCM_ADMIN_TOKEN").unwrap_or_default());
        if admin_token.is_empty() {
            warn!("🪛️ GCM_ADMIN_TOKEN is not set. The admin API is disabled.");
        }
        let catalog_file = env::var("GCM_CATALOG_FILE").ok().filter(|s| !s.trim().is_empty());
        let exchange_rates = configure_exchange_rates();
        let recovery_interval =
            Duration::from_secs(env_or_default("GCM_RECOVERY_INTERVAL_SECS", DEFAULT_RECOVERY_INTERVAL.as_secs()));
        let stalled_order_age =
            Duration::from_secs(env_or_default("GCM_STALLED_ORDER_AGE_SECS", DEFAULT_STALLED_ORDER_AGE.as_secs()));
        let fulfillment = configure_fulfillment(stalled_order_age);
        let coingate = CoinGateConfig::new_from_env_or_default();
        let tango = TangoConfig::new_from_env_or_default();
        let mail = MailConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            webhook_whitelist,
            admin_token,
            catalog_file,
            exchange_rates,
            fulfillment,
            recovery_interval,
            stalled_order_age,
            coingate,
            tango,
            mail,
        }
    }

    pub fn exchange_rates(&self) -> StaticExchangeRates {
        StaticExchangeRates::new(&self.exchange_rates)
    }
}

impl MailConfig {
    pub fn from_env_or_default() -> Self {
        let relay_url = env::var("GCM_MAIL_RELAY_URL").ok().filter(|s| !s.trim().is_empty());
        if relay_url.is_none() {
            warn!(
                "🪛️ GCM_MAIL_RELAY_URL is not set. Gift card codes will not be emailed, and will need to be re-sent \
                 from the admin API."
            );
        }
        let api_key = Secret::new(env::var("GCM_MAIL_API_KEY").unwrap_or_default());
        let from = env::var("GCM_MAIL_FROM").unwrap_or_else(|_| "giftcards@localhost".to_string());
        Self { relay_url, api_key, from, subject: DEFAULT_MAIL_SUBJECT.to_string() }
    }
}

/// Parses the webhook whitelist. "none", "false" and "0" (or an unset variable) disable it.
pub fn configure_webhook_whitelist(value: Option<String>) -> Option<Vec<IpAddr>> {
    let value = value?;
    if ["", "none", "false", "0"].contains(&value.trim().to_lowercase().as_str()) {
        info!("🪛️ Payment webhook IP whitelist is disabled.");
        return None;
    }
    let ip_addrs = split_list(&value)
        .into_iter()
        .filter_map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in GCM_WEBHOOK_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    if ip_addrs.is_empty() {
        warn!(
            "🚨️ The payment webhook IP whitelist was configured, but is empty. The server will run, but won't accept \
             any payment callbacks."
        );
    } else {
        let list = ip_addrs.iter().map(|ip| ip.to_string()).collect::<Vec<_>>().join(", ");
        info!("🪛️ Payment webhook IP whitelist: {list}");
    }
    Some(ip_addrs)
}

fn configure_exchange_rates() -> Vec<(PaymentMethod, Decimal)> {
    default_exchange_rates()
        .into_iter()
        .map(|(method, default)| {
            let key = format!("GCM_RATE_{}", method.currency_code());
            match env_or_default::<Decimal>(&key, default) {
                rate if rate > Decimal::ZERO => (method, rate),
                rate => {
                    error!("🪛️ {key} must be positive, but is {rate}. Using {default} instead.");
                    (method, default)
                },
            }
        })
        .collect()
}

/// `processing` orders become resumable at the same age the recovery worker considers them stalled.
fn configure_fulfillment(stalled_order_age: Duration) -> FulfillmentOptions {
    let defaults = RetryPolicy::default();
    let max_concurrent_purchases =
        env_or_default("GCM_MAX_CONCURRENT_PURCHASES", DEFAULT_MAX_CONCURRENT_PURCHASES).max(1);
    let attempt_timeout =
        Duration::from_secs(env_or_default("GCM_PURCHASE_TIMEOUT_SECS", defaults.attempt_timeout.as_secs()).max(1));
    let purchase_retry = RetryPolicy {
        max_attempts: env_or_default("GCM_PURCHASE_MAX_ATTEMPTS", defaults.max_attempts).max(1),
        attempt_timeout,
        ..defaults
    };
    let delivery_retry = RetryPolicy {
        max_attempts: env_or_default("GCM_DELIVERY_MAX_ATTEMPTS", defaults.max_attempts).max(1),
        ..defaults
    };
    FulfillmentOptions { max_concurrent_purchases, purchase_retry, delivery_retry, resume_after: stalled_order_age }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whitelist_parsing() {
        assert!(configure_webhook_whitelist(None).is_none());
        assert!(configure_webhook_whitelist(Some("none".into())).is_none());
        assert!(configure_webhook_whitelist(Some("0".into())).is_none());
        let list = configure_webhook_whitelist(Some("10.0.0.1, not-an-ip, ::1".into())).unwrap();
        assert_eq!(list, vec!["10.0.0.1".parse::<IpAddr>().unwrap(), "::1".parse::<IpAddr>().unwrap()]);
        let empty = configure_webhook_whitelist(Some("bogus".into())).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::new("0.0.0.0", 9000);
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.recovery_interval, Duration::from_secs(300));
        assert_eq!(config.stalled_order_age, Duration::from_secs(600));
        assert!(config.admin_token.is_empty());
        assert_eq!(config.exchange_rates.len(), 3);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        env::set_var("GCM_TEST_CONFIG_PORT", "eighty");
        assert_eq!(env_or_default("GCM_TEST_CONFIG_PORT", 8360u16), 8360);
        env::set_var("GCM_TEST_CONFIG_PORT", "8080");
        assert_eq!(env_or_default("GCM_TEST_CONFIG_PORT", 8360u16), 8080);
    }
}
