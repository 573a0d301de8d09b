use crate::comments::CommentError;
use crate::database::DatabaseError;
use crate::rating::{RatingError, ValidationIssue};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(config::ConfigError),
    Database(DatabaseError),
    Validation(Vec<ValidationIssue>),
    BadRequest(String),
    NotFound(String),
    Forbidden(String),
    Conflict(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "Configuration error: {}", err),
            AppError::Database(err) => write!(f, "Database error: {}", err),
            AppError::Validation(issues) => {
                write!(f, "Validation failed for {} field(s)", issues.len())
            }
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<RatingError> for AppError {
    fn from(err: RatingError) -> Self {
        match err {
            RatingError::Validation(issues) => AppError::Validation(issues),
            RatingError::Conflict(msg) => AppError::Conflict(msg),
            RatingError::Storage(msg) | RatingError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<CommentError> for AppError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::NotFound(msg) => AppError::NotFound(msg),
            CommentError::Forbidden(msg) => AppError::Forbidden(msg),
            CommentError::Validation(msg) => AppError::BadRequest(msg),
            CommentError::Storage(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error"),
            AppError::Database(DatabaseError::NotFound) => (StatusCode::NOT_FOUND, "Not found"),
            AppError::Database(DatabaseError::Conflict(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Write conflict")
            }
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Validation failed"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            AppError::Conflict(_) => (StatusCode::SERVICE_UNAVAILABLE, "Write conflict"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        let body = match &self {
            AppError::Validation(issues) => json!({
                "error": error_message,
                "message": self.to_string(),
                "issues": issues,
            }),
            _ => json!({
                "error": error_message,
                "message": self.to_string()
            }),
        };

        (status, Json(body)).into_response()
    }
}
