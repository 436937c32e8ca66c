use gcm_common::Secret;
use log::*;

pub const DEFAULT_COINGATE_API_URL: &str = "https://api-sandbox.coingate.com/api/v2";

#[derive(Debug, Clone, Default)]
pub struct CoinGateConfig {
    pub api_url: String,
    pub auth_token: Secret<String>,
    pub callback_secret: Secret<String>,
    /// Public URL of this server, used to build the callback and redirect URLs
    pub public_base_url: String,
}

impl CoinGateConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("GCM_COINGATE_API_URL").unwrap_or_else(|_| {
            warn!("💳️ GCM_COINGATE_API_URL not set, using the sandbox ({DEFAULT_COINGATE_API_URL})");
            DEFAULT_COINGATE_API_URL.to_string()
        });
        let auth_token = Secret::new(std::env::var("GCM_COINGATE_AUTH_TOKEN").unwrap_or_else(|_| {
            warn!("💳️ GCM_COINGATE_AUTH_TOKEN not set. Payment sessions cannot be created.");
            String::default()
        }));
        let callback_secret = Secret::new(std::env::var("GCM_COINGATE_CALLBACK_SECRET").unwrap_or_else(|_| {
            warn!("💳️ GCM_COINGATE_CALLBACK_SECRET not set. Every payment callback will be rejected.");
            String::default()
        }));
        let public_base_url = std::env::var("GCM_PUBLIC_BASE_URL").unwrap_or_else(|_| {
            warn!("💳️ GCM_PUBLIC_BASE_URL not set, using (probably useless) default");
            "http://localhost:8360".to_string()
        });
        Self { api_url, auth_token, callback_secret, public_base_url }
    }

    fn base(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }

    pub fn callback_url(&self) -> String {
        format!("{}/api/webhook/payment", self.base())
    }

    pub fn success_url(&self) -> String {
        format!("{}/success", self.base())
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/cancel", self.base())
    }
}
