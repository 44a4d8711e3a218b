//! Error types for the AuroraMart backend
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation. Storage,
//! service, and API layers all share the same error enum so that handlers
//! can map failures to HTTP status codes in one place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Main error type for AuroraMart operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stock decrement would take a product below zero
    #[error("Out of stock: {0}")]
    OutOfStock(String),

    /// Loyalty redemption exceeds the account balance
    #[error("Insufficient loyalty points: requested {requested}, balance {balance}")]
    InsufficientPoints { requested: i64, balance: i64 },

    /// Field-level validation failures (no partial writes)
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Order status transition not allowed
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    /// Checkout attempted against an empty cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Missing or invalid session token
    #[error("Unauthorized")]
    Unauthorized,

    /// Session is valid but the role lacks the required capability
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Username already taken, duplicate SKU, etc.
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Prediction model artifact could not be loaded or is inconsistent
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid UUID in a request path or body
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] uuid::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for AuroraMart operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// A single field validation failure, surfaced to the client as-is
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Convert anyhow::Error to StoreError
impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Other(err.to_string())
    }
}

impl StoreError {
    /// HTTP status code this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::OutOfStock(_)
            | StoreError::InsufficientPoints { .. }
            | StoreError::InvalidTransition(_)
            | StoreError::EmptyCart => StatusCode::CONFLICT,
            StoreError::Validation(_) | StoreError::InvalidId(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            StoreError::Unauthorized => StatusCode::UNAUTHORIZED,
            StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            StoreError::AlreadyExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the logs, not in responses
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {}", self);
            let body = serde_json::json!({ "error": "internal server error" });
            return (status, Json(body)).into_response();
        }

        let body = match &self {
            StoreError::Validation(fields) => {
                serde_json::json!({ "error": "validation failed", "fields": fields })
            }
            other => serde_json::json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("product abc".to_string());
        assert_eq!(err.to_string(), "Not found: product abc");

        let err = StoreError::InsufficientPoints {
            requested: 500,
            balance: 120,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient loyalty points: requested 500, balance 120"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            StoreError::OutOfStock("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            StoreError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StoreError::Validation(vec![]).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            StoreError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_error_conversion() {
        let uuid_err = uuid::Uuid::parse_str("invalid");
        assert!(uuid_err.is_err());

        let store_err: StoreError = uuid_err.unwrap_err().into();
        assert!(matches!(store_err, StoreError::InvalidId(_)));
    }
}
