use thiserror::Error;

use crate::traits::ServiceError;

/// Errors from the reader API client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The server answered 200 but with a non-zero business code.
    #[error("{message}")]
    Server { code: i64, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl ServiceError for ApiError {
    fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::Api { status: 404, .. } | ApiError::Server { code: 404, .. }
        )
    }
}
