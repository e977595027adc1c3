use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Store(StoreError::Duplicate(_)) => (StatusCode::CONFLICT, "DUPLICATE"),
            AppError::Store(StoreError::NotFound(_)) | AppError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            AppError::Store(StoreError::Invalid(_)) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST")
            }
            AppError::Store(StoreError::Database(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
            "Internal server error".to_string()
        } else {
            match &self {
                AppError::Store(StoreError::NotFound(what)) | AppError::NotFound(what) => {
                    format!("{} not found", what)
                }
                AppError::Store(e) => e.to_string(),
                AppError::Validation(msg) => msg.clone(),
            }
        };

        let body = Json(json!({
            "success": false,
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::Store(StoreError::Duplicate("Card UID already registered".into())),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Store(StoreError::NotFound("Card".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Validation("month must be 1-12".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Store(StoreError::Database(sqlx::Error::PoolTimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
