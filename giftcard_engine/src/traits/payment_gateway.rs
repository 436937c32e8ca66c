use thiserror::Error;

use crate::traits::{PaymentNotification, SessionHandle, SessionRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("The notification signature is missing or invalid")]
    InvalidSignature,
    #[error("The notification is malformed: {0}")]
    NotificationMalformed(String),
    #[error("The payment gateway is unavailable: {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request: {0}")]
    Rejected(String),
}

/// The crypto payment processor.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Opens a hosted payment session for the given order and returns the buyer-facing payment details. The handle's
    /// `id` is the correlation id that later notifications will carry.
    async fn create_session(&self, request: SessionRequest) -> Result<SessionHandle, GatewayError>;

    /// Authenticates a raw notification body against its signature and extracts the correlation id and status.
    ///
    /// This must fail with [`GatewayError::InvalidSignature`] whenever authenticity cannot be established, and with
    /// [`GatewayError::NotificationMalformed`] if the correlation id or status is missing. No payload content may be
    /// trusted before this returns `Ok`.
    fn verify_notification(&self, raw: &[u8], signature: Option<&str>)
        -> Result<PaymentNotification, GatewayError>;
}
