//! Mapping from vault errors to HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::KeyVaultError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// An error on its way out of a handler, already paired with a status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

/// Status code for each error kind.
pub fn status_for(error: &KeyVaultError) -> StatusCode {
    match error {
        KeyVaultError::VaultUnlock
        | KeyVaultError::Authentication
        | KeyVaultError::SessionExpired
        | KeyVaultError::DecryptionFailed => StatusCode::UNAUTHORIZED,
        KeyVaultError::KeyNotFound { .. } => StatusCode::NOT_FOUND,
        KeyVaultError::KeyExpired { .. } | KeyVaultError::KeyDisabled(_) => StatusCode::FORBIDDEN,
        KeyVaultError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<KeyVaultError> for ApiError {
    fn from(error: KeyVaultError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            tracing::error!(error = %error, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %error, "request rejected");
        }

        let message = match error {
            KeyVaultError::Authentication => "Invalid master password".to_string(),
            KeyVaultError::SessionExpired => "Authentication required".to_string(),
            other => other.to_string(),
        };
        Self::new(status, message)
    }
}

/// Unreadable request bodies (bad JSON, wrong field types, missing
/// content type) are client errors like any other validation failure.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = rejection.status().as_u16(), "request body rejected");
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
