//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input: bad JSON body, bad timestamp, bad id.
    #[error("{0}")]
    BadRequest(String),

    /// The persistence backend was never initialized or is unreachable.
    #[error("Database not connected")]
    Unavailable,

    /// The target record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Unexpected failure from the persistence layer.
    #[error("{0}")]
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Unavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Database not connected" }),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "status": "error", "message": msg }),
            ),
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}
