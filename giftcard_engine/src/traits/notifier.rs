use thiserror::Error;

use crate::traits::OrderSummary;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifierError {
    #[error("Could not deliver gift card codes: {0}")]
    Transient(String),
}

/// Delivers purchased gift card codes to the buyer.
#[allow(async_fn_in_trait)]
pub trait GiftCardNotifier {
    async fn deliver(&self, recipient: &str, summary: &OrderSummary) -> Result<(), NotifierError>;
}
