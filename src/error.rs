//! Application error type.
//!
//! Every service returns `Result<T, AppError>`. A business failure carries a
//! response code and message; infrastructure failures surface as
//! `SYSTEM_ERROR` without exposing details to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::message::{codes, RespMessage};

#[derive(Debug, Error)]
pub enum AppError {
    /// Rule violation reported to the client as-is.
    #[error("{message}")]
    Business { code: &'static str, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn business(code: &'static str, message: impl Into<String>) -> Self {
        Self::Business { code, message: message.into() }
    }
    pub fn not_null(message: impl Into<String>) -> Self { Self::business(codes::FIELD_NOT_NULL, message) }
    pub fn not_valid(message: impl Into<String>) -> Self { Self::business(codes::FIELD_NOT_VALID, message) }
    pub fn existed(message: impl Into<String>) -> Self { Self::business(codes::FIELD_EXISTED, message) }
    pub fn field_not_found(message: impl Into<String>) -> Self { Self::business(codes::FIELD_NOT_FOUND, message) }
    pub fn not_found(message: impl Into<String>) -> Self { Self::business(codes::NOT_FOUND, message) }
    pub fn unauthorized(message: impl Into<String>) -> Self { Self::business(codes::UNAUTHORIZED, message) }
    pub fn forbidden(message: impl Into<String>) -> Self { Self::business(codes::FORBIDDEN, message) }
    pub fn system(message: impl Into<String>) -> Self { Self::business(codes::SYSTEM_ERROR, message) }

    /// Response code carried by this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Business { code, .. } => code,
            Self::Database(_) | Self::Internal(_) => codes::SYSTEM_ERROR,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            codes::FIELD_NOT_NULL | codes::FIELD_NOT_VALID | codes::FIELD_EXISTED => StatusCode::BAD_REQUEST,
            codes::FIELD_NOT_FOUND | codes::NOT_FOUND => StatusCode::NOT_FOUND,
            codes::UNAUTHORIZED => StatusCode::UNAUTHORIZED,
            codes::FORBIDDEN => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            tracing::error!(error = %self, "Request error");
        }

        // Don't expose internal error details to clients
        let resp_desc = match &self {
            Self::Business { message, .. } => message.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
        };

        let body = RespMessage { resp_code: self.code().to_string(), resp_desc, data: serde_json::Value::Null };
        (self.status(), Json(body)).into_response()
    }
}

/// Maps a database failure to a `SYSTEM_ERROR` with a business message, logging the cause.
pub trait ResultExt<T> {
    fn or_system(self, message: &str) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn or_system(self, message: &str) -> Result<T, AppError> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{message}");
            AppError::system(message)
        })
    }
}

/// Result type alias for `AppError`.
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_code() {
        assert_eq!(AppError::not_null("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::existed("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::field_not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Internal("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::business(codes::UNDEFINED, "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn or_system_wraps_database_errors() {
        let res: Result<(), sqlx::Error> = Err(sqlx::Error::RowNotFound);
        let err = res.or_system("Error when add brand").unwrap_err();
        assert_eq!(err.code(), codes::SYSTEM_ERROR);
        assert_eq!(err.to_string(), "Error when add brand");
    }

    #[test]
    fn database_errors_are_system_errors() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.code(), codes::SYSTEM_ERROR);
    }
}
