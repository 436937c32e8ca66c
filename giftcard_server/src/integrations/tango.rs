use giftcard_engine::{
    catalog::Catalog,
    db_types::GiftCard,
    traits::{CardRequest, GiftCardProvider, ProviderError},
};
use log::*;
use tango_tools::{TangoApi, TangoApiError};

/// [`GiftCardProvider`] backed by Tango Card's RaaS API.
///
/// The purchase's idempotency key is sent as Tango's `externalRefID`. Tango refuses a second order with the same
/// reference, and the client answers that refusal with the original order, so a retried purchase never buys a second
/// card.
#[derive(Clone)]
pub struct TangoProvider {
    api: TangoApi,
    catalog: Catalog,
}

impl TangoProvider {
    pub fn new(api: TangoApi, catalog: Catalog) -> Self {
        Self { api, catalog }
    }
}

fn provider_error(e: TangoApiError) -> ProviderError {
    if e.is_transient() {
        ProviderError::Unavailable(e.to_string())
    } else {
        ProviderError::Rejected(e.to_string())
    }
}

impl GiftCardProvider for TangoProvider {
    async fn purchase_card(&self, request: &CardRequest) -> Result<GiftCard, ProviderError> {
        let sku = self.catalog.sku_for(&request.brand, request.denomination)?;
        let order = self.api.new_order_request(
            sku.as_str(),
            request.denomination.to_dollars_decimal(),
            &request.recipient,
            request.idempotency_key.as_str(),
        );
        let reward = self.api.place_order(order).await.map_err(provider_error)?;
        // An order without credentials is usually still being processed at Tango. Asking again with the same
        // reference returns the finished order.
        let credentials = reward.gift_card().ok_or_else(|| {
            warn!("🎁️ Tango order {} for {} has no credentials yet", reward.reference_order_id, request.idempotency_key);
            ProviderError::Unavailable(TangoApiError::MissingCredentials(reward.reference_order_id.clone()).to_string())
        })?;
        debug!("🎁️ Gift card issued for {} ({sku})", request.idempotency_key);
        Ok(GiftCard::new(credentials.code, credentials.pin))
    }
}

#[cfg(test)]
mod test {
    use gcm_common::{Cents, Secret};
    use giftcard_engine::{db_types::OrderId, traits::IdempotencyKey};
    use tango_tools::TangoConfig;

    use super::*;

    fn provider() -> TangoProvider {
        let config = TangoConfig {
            // Nothing listens here. Purchases that get as far as the network fail as unavailable.
            api_url: "http://127.0.0.1:9".into(),
            platform_name: "platform".into(),
            api_key: Secret::new("key".into()),
            account_id: "acct".into(),
            customer_id: "cust".into(),
            campaign: "GiftCardCampaign".into(),
        };
        TangoProvider::new(TangoApi::new(config).unwrap(), Catalog::default())
    }

    fn request(brand: &str, dollars: i64) -> CardRequest {
        let order_id = OrderId::from("ORD-1");
        let denomination = Cents::from_dollars(dollars);
        CardRequest {
            idempotency_key: IdempotencyKey::new(&order_id, 0, brand, denomination),
            order_id,
            line_item_index: 0,
            brand: brand.to_string(),
            denomination,
            recipient: "buyer@example.com".into(),
        }
    }

    #[tokio::test]
    async fn unknown_brands_are_catalog_errors() {
        let err = provider().purchase_card(&request("Blockbuster", 25)).await.unwrap_err();
        assert!(matches!(err, ProviderError::CatalogMapping(_)));
        let err = provider().purchase_card(&request("Amazon", 30)).await.unwrap_err();
        assert!(matches!(err, ProviderError::CatalogMapping(_)));
    }

    #[tokio::test]
    async fn unreachable_issuer_is_transient() {
        let err = provider().purchase_card(&request("Amazon", 25)).await.unwrap_err();
        assert!(err.is_transient(), "{err}");
    }

    #[test]
    fn error_mapping() {
        assert!(provider_error(TangoApiError::QueryError { status: 500, message: "oops".into() }).is_transient());
        assert!(provider_error(TangoApiError::QueryError { status: 429, message: "slow down".into() }).is_transient());
        let e = provider_error(TangoApiError::QueryError { status: 400, message: "insufficient funds".into() });
        assert!(matches!(e, ProviderError::Rejected(_)));
    }
}
