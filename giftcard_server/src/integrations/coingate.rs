use coingate_tools::{CallbackPayload, CoinGateApi, CoinGateApiError, CoinGateStatus};
use giftcard_engine::traits::{
    GatewayError,
    NotificationStatus,
    PaymentGateway,
    PaymentNotification,
    SessionHandle,
    SessionRequest,
};
use log::*;

/// [`PaymentGateway`] backed by CoinGate's hosted checkout
#[derive(Clone)]
pub struct CoinGateGateway {
    api: CoinGateApi,
}

impl CoinGateGateway {
    pub fn new(api: CoinGateApi) -> Self {
        Self { api }
    }
}

fn gateway_error(e: CoinGateApiError) -> GatewayError {
    match e {
        CoinGateApiError::InvalidSignature => GatewayError::InvalidSignature,
        CoinGateApiError::MalformedCallback(s) => GatewayError::NotificationMalformed(s),
        e if e.is_transient() => GatewayError::Unavailable(e.to_string()),
        e => GatewayError::Rejected(e.to_string()),
    }
}

pub fn notification_status(status: &CoinGateStatus) -> NotificationStatus {
    if status.is_confirmed() {
        NotificationStatus::Confirmed
    } else if status.is_rejected() {
        NotificationStatus::Rejected
    } else {
        NotificationStatus::Ignorable(status.to_string())
    }
}

fn to_notification(payload: CallbackPayload) -> PaymentNotification {
    let status = notification_status(&payload.status);
    PaymentNotification { correlation_id: payload.id, status }
}

impl PaymentGateway for CoinGateGateway {
    async fn create_session(&self, request: SessionRequest) -> Result<SessionHandle, GatewayError> {
        let order_request = self.api.new_order_request(
            request.order_id.as_str(),
            request.price.to_dollars_decimal(),
            request.receive_currency.currency_code(),
            &request.title,
            &request.description,
        );
        let order = self.api.create_order(order_request).await.map_err(|e| {
            warn!("💳️ Could not create a CoinGate order for {}. {e}", request.order_id);
            gateway_error(e)
        })?;
        Ok(SessionHandle {
            id: order.id.to_string(),
            pay_url: order.payment_url,
            receive_address: order.payment_address,
        })
    }

    fn verify_notification(&self, raw: &[u8], signature: Option<&str>) -> Result<PaymentNotification, GatewayError> {
        let payload = self.api.verify_callback(raw, signature).map_err(gateway_error)?;
        trace!("💳️ CoinGate callback for order #{} is '{}'", payload.id, payload.status);
        Ok(to_notification(payload))
    }
}
