//! Gateway error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors the gateway surfaces as non-200 statuses.
///
/// Authentication failures deliberately carry no detail in the body, and
/// the offending signature is never logged.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Signature mismatch or missing signature material.
    #[error("invalid signature")]
    InvalidSignature,

    /// Timestamp outside the replay window.
    #[error("stale request timestamp")]
    StaleTimestamp,

    /// The payload could not be parsed into a known envelope.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// No integration endpoint is registered under that name.
    #[error("unknown plugin '{0}'")]
    UnknownPlugin(String),

    /// OAuth state missing, expired, or mismatched.
    #[error("invalid oauth state")]
    InvalidOAuthState,
}

impl GatewayError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidSignature
            | GatewayError::StaleTimestamp
            | GatewayError::InvalidOAuthState => StatusCode::UNAUTHORIZED,
            GatewayError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            GatewayError::UnknownPlugin(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match status {
            // No detail on authentication failures.
            StatusCode::UNAUTHORIZED => serde_json::json!({"error": "unauthorized"}),
            _ => serde_json::json!({"error": self.to_string()}),
        };
        (status, axum::Json(body)).into_response()
    }
}
