//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::engine::TransferError;
use crate::store::{StorageErrorKind, StoreError};
use crate::token::TokenError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // Core errors
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Store(#[from] StoreError),

    // Server errors (5xx)
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// Status code and stable machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),

            AppError::Token(err) => match err {
                TokenError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
                TokenError::ExpiredToken => (StatusCode::UNAUTHORIZED, "expired_token"),
                TokenError::KeyTooShort { .. }
                | TokenError::DurationOutOfRange
                | TokenError::Crypto(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "token_error")
                }
            },

            AppError::Transfer(err) => match err {
                TransferError::SameAccount => (StatusCode::BAD_REQUEST, "same_account_transfer"),
                TransferError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
                TransferError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "account_not_found"),
                TransferError::CurrencyMismatch { .. } => {
                    (StatusCode::BAD_REQUEST, "currency_mismatch")
                }
                TransferError::InsufficientFunds { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_funds")
                }
                TransferError::TransactionConflict { .. } => {
                    (StatusCode::CONFLICT, "transaction_conflict")
                }
                TransferError::TransactionFatal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "transaction_failed")
                }
            },

            AppError::Store(err) => match err.kind() {
                StorageErrorKind::UniqueViolation => (StatusCode::FORBIDDEN, "unique_violation"),
                StorageErrorKind::ForeignKeyViolation => {
                    (StatusCode::FORBIDDEN, "foreign_key_violation")
                }
                StorageErrorKind::Other => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },

            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let details = match &self {
            AppError::InvalidRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => Some(msg.clone()),
            AppError::Transfer(err) if err.is_client_error() => Some(err.to_string()),
            _ => None,
        };

        // Server-side failures are logged here and never echoed to the client
        let error = if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
