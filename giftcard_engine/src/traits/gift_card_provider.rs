use thiserror::Error;

use crate::{catalog::CatalogError, db_types::GiftCard, traits::CardRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The issuer could not be reached, timed out, or asked us to back off. The same request may be retried.
    #[error("The gift card provider is unavailable: {0}")]
    Unavailable(String),
    /// The issuer refused this purchase. Retrying the same request will not help.
    #[error("The gift card provider rejected the purchase: {0}")]
    Rejected(String),
    #[error("Catalog mapping error: {0}")]
    CatalogMapping(#[from] CatalogError),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// The gift card issuer.
#[allow(async_fn_in_trait)]
pub trait GiftCardProvider {
    /// Purchases one gift card.
    ///
    /// Implementations must forward `request.idempotency_key` to the issuer so that a repeated call with the same key
    /// returns the card issued by the first successful call instead of purchasing a second one.
    async fn purchase_card(&self, request: &CardRequest) -> Result<GiftCard, ProviderError>;
}
