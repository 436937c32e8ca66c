use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
    StatusCode,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::TangoConfig,
    data_objects::{OrderList, OrderRequest, Recipient, RewardOrder},
    TangoApiError,
};

#[derive(Clone)]
pub struct TangoApi {
    config: TangoConfig,
    client: Arc<Client>,
}

impl TangoApi {
    pub fn new(config: TangoConfig) -> Result<Self, TangoApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let credentials = base64::encode(format!("{}:{}", config.platform_name, config.api_key.reveal()));
        let mut val = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|e| TangoApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| TangoApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &TangoConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, TangoApiError> {
        let url = self.url(path);
        trace!("🎁️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await?;
        if response.status().is_success() {
            trace!("🎁️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| TangoApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            Err(TangoApiError::QueryError { status, message })
        }
    }

    /// Builds an order for one gift card, using the configured account, customer and campaign
    pub fn new_order_request(&self, utid: &str, amount: Decimal, recipient: &str, external_ref_id: &str) -> OrderRequest {
        OrderRequest {
            account_identifier: self.config.account_id.clone(),
            customer_identifier: self.config.customer_id.clone(),
            utid: utid.to_string(),
            amount,
            campaign: self.config.campaign.clone(),
            email_subject: "Your gift card".to_string(),
            send_email: false,
            recipient: Recipient { email: recipient.to_string(), first_name: None },
            external_ref_id: external_ref_id.to_string(),
        }
    }

    /// Places an order for one gift card.
    ///
    /// If Tango already has an order with the same `externalRefID`, that order is returned instead.
    pub async fn place_order(&self, request: OrderRequest) -> Result<RewardOrder, TangoApiError> {
        let reference = request.external_ref_id.clone();
        debug!("🎁️ Placing Tango order {reference} for {} ${}", request.utid, request.amount);
        match self.rest_query::<RewardOrder, _>(Method::POST, "/orders", &[], Some(request)).await {
            Ok(order) => {
                info!("🎁️ Tango order {} placed for {reference}", order.reference_order_id);
                Ok(order)
            },
            Err(TangoApiError::QueryError { status, message }) if status == StatusCode::CONFLICT.as_u16() => {
                info!("🎁️ Tango already has an order for {reference}. Fetching it.");
                self.find_order_by_reference(&reference)
                    .await?
                    .ok_or(TangoApiError::QueryError { status, message })
            },
            Err(e) => {
                warn!("🎁️ Tango order {reference} failed: {e}");
                Err(e)
            },
        }
    }

    /// Looks up an earlier order by the reference it was placed with
    pub async fn find_order_by_reference(&self, external_ref_id: &str) -> Result<Option<RewardOrder>, TangoApiError> {
        let params = [("externalRefID", external_ref_id)];
        let list = self.rest_query::<OrderList, ()>(Method::GET, "/orders", &params, None).await?;
        Ok(list.orders.into_iter().find(|o| o.external_ref_id.as_deref() == Some(external_ref_id)))
    }
}
