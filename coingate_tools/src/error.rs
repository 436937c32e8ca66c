use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoinGateApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach CoinGate: {0}")]
    RestRequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The callback signature is missing or invalid")]
    InvalidSignature,
    #[error("Malformed callback: {0}")]
    MalformedCallback(String),
}

impl CoinGateApiError {
    /// True if repeating the same request later might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RestRequestError(_) => true,
            Self::QueryError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CoinGateApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::RestRequestError(e.to_string())
    }
}
