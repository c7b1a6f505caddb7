//! Error types for omnibus.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for omnibus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for omnibus.
///
/// Provider failures are not represented here: they are folded into the
/// composite text by the aggregator and never reach the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("No user message found in 'messages'")]
    MissingPrompt,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Bearer token authentication required")]
    Unauthorized,

    #[error("Invalid API key")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::MissingPrompt => StatusCode::BAD_REQUEST,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        // Return OpenAI-compatible error format
        let body = serde_json::json!({
            "error": {
                "message": message,
                "type": "omnibus_error",
                "code": status.as_u16()
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
