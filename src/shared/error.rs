use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures of the ticket store and the read engines built on it. Every
/// variant maps to one HTTP status; raw database errors stay behind the
/// 500 boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{field} {message}")]
    Validation { field: String, message: String },

    #[error("invalid status value: {0}")]
    InvalidTransition(String),

    #[error("{0}")]
    ReferentialIntegrity(String),

    #[error("not found")]
    NotFound,

    #[error("database pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("database error: {0}")]
    Database(diesel::result::Error),
}

impl StoreError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::NotFound,
            other => Self::Database(other),
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation { .. } | Self::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            Self::ReferentialIntegrity(_) => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Pool(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("store error: {self}");
            return (status, Json(json!({ "error": "internal server error" }))).into_response();
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diesel_not_found_becomes_not_found() {
        let err: StoreError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn validation_names_the_field() {
        let err = StoreError::validation("email", "is required");
        assert_eq!(err.to_string(), "email is required");
    }
}
