//! Error types for registry and health-check operations.

use axum::http::StatusCode;
use sea_orm::DbErr;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// The write would duplicate an existing record.
    #[error("{0}")]
    Conflict(String),

    /// The request was malformed.
    #[error("{0}")]
    Validation(String),

    /// The candidate webhook answered 401 or 404.
    #[error("webhook returned HTTP {status_code}: appears invalid or deleted")]
    WebhookMissing { status_code: u16 },

    /// The candidate webhook answered with some other non-2xx status.
    #[error("webhook returned HTTP {status_code}")]
    WebhookRejected { status_code: u16 },

    /// The candidate webhook could not be reached at all.
    #[error("error reaching webhook: {0}")]
    WebhookUnreachable(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl RegistryError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
            RegistryError::Conflict(_) => StatusCode::CONFLICT,
            RegistryError::Validation(_) => StatusCode::BAD_REQUEST,
            RegistryError::WebhookMissing { .. } | RegistryError::WebhookRejected { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            RegistryError::WebhookUnreachable(_) => StatusCode::BAD_GATEWAY,
            RegistryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RegistryError> for (StatusCode, String) {
    fn from(err: RegistryError) -> Self {
        if let RegistryError::Database(e) = &err {
            tracing::error!("Database error: {e}");
        }
        (err.status_code(), err.to_string())
    }
}
