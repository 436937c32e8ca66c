use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::CoinGateConfig,
    data_objects::{CallbackPayload, CoinGateOrder, CreateOrderRequest},
    signature::verify_callback_signature,
    CoinGateApiError,
};

#[derive(Clone)]
pub struct CoinGateApi {
    config: CoinGateConfig,
    client: Arc<Client>,
}

impl CoinGateApi {
    pub fn new(config: CoinGateConfig) -> Result<Self, CoinGateApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let token = format!("Bearer {}", config.auth_token.reveal());
        let mut val = HeaderValue::from_str(&token).map_err(|e| CoinGateApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| CoinGateApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &CoinGateConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, CoinGateApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| CoinGateApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            Err(CoinGateApiError::QueryError { status, message })
        }
    }

    /// Fills in the callback and redirect URLs for a new payment order
    pub fn new_order_request(
        &self,
        order_id: &str,
        price_usd: Decimal,
        receive_currency: &str,
        title: &str,
        description: &str,
    ) -> CreateOrderRequest {
        CreateOrderRequest {
            order_id: order_id.to_string(),
            price_amount: price_usd,
            price_currency: "USD".to_string(),
            receive_currency: receive_currency.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            callback_url: self.config.callback_url(),
            cancel_url: self.config.cancel_url(),
            success_url: self.config.success_url(),
        }
    }

    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<CoinGateOrder, CoinGateApiError> {
        debug!("💳️ Creating CoinGate order for {} ({} USD)", request.order_id, request.price_amount);
        let order = self.rest_query::<CoinGateOrder, _>(Method::POST, "/orders", Some(request)).await?;
        info!("💳️ Created CoinGate order #{} ({})", order.id, order.status);
        Ok(order)
    }

    pub async fn get_order(&self, id: u64) -> Result<CoinGateOrder, CoinGateApiError> {
        let path = format!("/orders/{id}");
        debug!("💳️ Fetching CoinGate order #{id}");
        self.rest_query::<CoinGateOrder, ()>(Method::GET, &path, None).await
    }

    /// Authenticates and parses a payment callback
    pub fn verify_callback(&self, body: &[u8], signature: Option<&str>) -> Result<CallbackPayload, CoinGateApiError> {
        verify_callback_signature(self.config.callback_secret.reveal(), body, signature)?;
        CallbackPayload::parse(body)
    }
}
