use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Region unavailable: {0}")]
    RegionUnavailable(String),
}

/// Durable lease store failures
///
/// Kept apart from `AppError` because the lease guard reacts differently to
/// each kind and never surfaces either to a caller.
#[derive(Error, Debug)]
pub enum LeaseStoreError {
    #[error("lease table does not exist")]
    MissingTable,

    #[error("lease store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for LeaseStoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("42P01") => {
                LeaseStoreError::MissingTable
            }
            _ => LeaseStoreError::Unavailable(error.to_string()),
        }
    }
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            AppError::RegionUnavailable(region) => (
                StatusCode::BAD_REQUEST,
                "REGION_UNAVAILABLE",
                format!("Region {} is not configured", region),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: message,
            error_code: error_code.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let response = AppError::BadRequest("userId is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::RegionUnavailable("us".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_non_database_sqlx_error_is_unavailable() {
        let err = LeaseStoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, LeaseStoreError::Unavailable(_)));
    }
}
