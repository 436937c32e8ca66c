use thiserror::Error;

#[derive(Debug, Error)]
pub enum TangoApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach Tango: {0}")]
    RestRequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Order {0} did not include any gift card credentials")]
    MissingCredentials(String),
}

impl TangoApiError {
    /// Transport failures, throttling and server errors are worth retrying. Any other client error is final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RestRequestError(_) => true,
            Self::QueryError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for TangoApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::RestRequestError(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transient_errors() {
        let q = |status| TangoApiError::QueryError { status, message: String::new() };
        assert!(TangoApiError::RestRequestError("reset".into()).is_transient());
        assert!(q(500).is_transient());
        assert!(q(503).is_transient());
        assert!(q(429).is_transient());
        assert!(!q(400).is_transient());
        assert!(!q(401).is_transient());
        assert!(!q(409).is_transient());
        assert!(!TangoApiError::MissingCredentials("RA1".into()).is_transient());
    }
}
