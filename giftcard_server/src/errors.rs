use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use giftcard_engine::{traits::OrderStoreError, FulfillmentError, OrderApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The payment gateway could not be reached. {0}")]
    PaymentGatewayError(String),
    #[error("Invalid payment notification. {0}")]
    InvalidNotification(String),
    #[error("The request cannot be carried out. {0}")]
    Conflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidNotification(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidToken => StatusCode::FORBIDDEN,
                AuthError::AdminDisabled => StatusCode::FORBIDDEN,
                AuthError::IpNotAllowed(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentGatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("The X-Admin-Token header is missing.")]
    MissingToken,
    #[error("The admin token is not valid.")]
    InvalidToken,
    #[error("The admin API is disabled on this server.")]
    AdminDisabled,
    #[error("Requests from {0} are not allowed.")]
    IpNotAllowed(String),
}

impl From<OrderStoreError> for ServerError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id} does not exist")),
            e => Self::BackendError(e.to_string()),
        }
    }
}

impl From<OrderApiError> for ServerError {
    fn from(e: OrderApiError) -> Self {
        match e {
            OrderApiError::InvalidItems(_) | OrderApiError::InvalidBuyerContact(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            OrderApiError::PaymentGatewayError(s) => Self::PaymentGatewayError(s),
            OrderApiError::ExchangeRateError(e) => Self::BackendError(e.to_string()),
            OrderApiError::StoreError(e) => e.into(),
        }
    }
}

impl From<FulfillmentError> for ServerError {
    fn from(e: FulfillmentError) -> Self {
        match e {
            FulfillmentError::InvalidSignature | FulfillmentError::NotificationMalformed(_) => {
                Self::InvalidNotification(e.to_string())
            },
            FulfillmentError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id} does not exist")),
            FulfillmentError::NotCompleted(..) => Self::Conflict(e.to_string()),
            FulfillmentError::DeliveryFailed(s) => Self::BackendError(format!("Could not deliver gift cards: {s}")),
            FulfillmentError::StoreError(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use giftcard_engine::db_types::{OrderId, OrderStatusType};

    use super::*;

    #[test]
    fn status_codes() {
        let e = ServerError::from(OrderApiError::InvalidItems("Unknown gift card brand: Foo".into()));
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        let e = ServerError::from(OrderApiError::PaymentGatewayError("timeout".into()));
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
        let e = ServerError::from(FulfillmentError::InvalidSignature);
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        let e = ServerError::from(FulfillmentError::StoreError(OrderStoreError::DatabaseError("gone".into())));
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let e = ServerError::from(FulfillmentError::NotCompleted(OrderId::from("ORD-1"), OrderStatusType::Failed));
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
        let e = ServerError::from(AuthError::MissingToken);
        assert_eq!(e.status_code(), StatusCode::UNAUTHORIZED);
    }
}
