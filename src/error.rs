//! Error types for the jukebox service
//!
//! Defines the service-wide error type using thiserror. Every error maps to
//! an HTTP status code so handlers can return `Result<_, Error>` directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Main error type for the jukebox service
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced track or queue entry does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Enqueue denied by the sliding-window rate limiter
    #[error("rate limit exceeded")]
    RateLimited,

    /// Request field outside its allowed range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing or invalid credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but insufficient role
    #[error("forbidden")]
    Forbidden,

    /// Configuration file loading errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Other errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the jukebox Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Config(_) | Error::Database(_) | Error::Http(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "status": format!("error: {}", self),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(Error::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            Error::InvalidArgument("volume".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }
}
