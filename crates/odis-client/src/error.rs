//! ODIS client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OdisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Out of quota")]
    QuotaExceeded,

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request signing failed: {0}")]
    Signing(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Service reported failure: {0}")]
    Unsuccessful(String),

    #[error("Blinding failed: {0}")]
    Blinding(String),

    #[error("Malformed signature: {0}")]
    Decode(String),
}
