use gcm_common::Secret;
use log::*;

pub const DEFAULT_TANGO_API_URL: &str = "https://integration-api.tangocard.com/raas/v2";

#[derive(Debug, Clone, Default)]
pub struct TangoConfig {
    pub api_url: String,
    pub platform_name: String,
    pub api_key: Secret<String>,
    pub account_id: String,
    pub customer_id: String,
    pub campaign: String,
}

impl TangoConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("GCM_TANGO_API_URL").unwrap_or_else(|_| {
            warn!("🎁️ GCM_TANGO_API_URL not set, using the integration sandbox ({DEFAULT_TANGO_API_URL})");
            DEFAULT_TANGO_API_URL.to_string()
        });
        let platform_name = std::env::var("GCM_TANGO_PLATFORM_NAME").unwrap_or_else(|_| {
            warn!("🎁️ GCM_TANGO_PLATFORM_NAME not set. Gift card purchases will fail.");
            String::default()
        });
        let api_key = Secret::new(std::env::var("GCM_TANGO_API_KEY").unwrap_or_else(|_| {
            warn!("🎁️ GCM_TANGO_API_KEY not set. Gift card purchases will fail.");
            String::default()
        }));
        let account_id = std::env::var("GCM_TANGO_ACCOUNT_ID").unwrap_or_else(|_| {
            warn!("🎁️ GCM_TANGO_ACCOUNT_ID not set. Gift card purchases will fail.");
            String::default()
        });
        let customer_id = std::env::var("GCM_TANGO_CUSTOMER_ID").unwrap_or_else(|_| {
            warn!("🎁️ GCM_TANGO_CUSTOMER_ID not set. Gift card purchases will fail.");
            String::default()
        });
        let campaign = std::env::var("GCM_TANGO_CAMPAIGN").unwrap_or_else(|_| "GiftCardCampaign".to_string());
        Self { api_url, platform_name, api_key, account_id, customer_id, campaign }
    }
}
