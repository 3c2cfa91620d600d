use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON error envelope returned by every service: a machine-readable
/// `code` plus a human-readable `message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Pair the envelope with a status code.
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    /// Machine-readable code carried in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            AppError::InternalError(_)
            | AppError::DatabaseError(_)
            | AppError::RedisError(_)
            | AppError::ConfigError(_) => "SOMETHING_WENT_WRONG",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message, details) = match self {
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                    None,
                )
            }
            AppError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
                None,
            ),
            // Driver text stays in the logs.
            AppError::DatabaseError(err) => {
                tracing::error!(error = ?err, "Database error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::RedisError(err) => {
                tracing::error!(error = ?err, "Redis error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Cache error".to_string(),
                    None,
                )
            }
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                Some(err.to_string()),
            ),
        };

        ErrorResponse {
            code: code.to_string(),
            message,
            details,
        }
        .with_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_share_generic_code() {
        let err = AppError::InternalError(anyhow::anyhow!("boom"));
        assert_eq!(err.code(), "SOMETHING_WENT_WRONG");
        let err = AppError::ConfigError(anyhow::anyhow!("missing"));
        assert_eq!(err.code(), "SOMETHING_WENT_WRONG");
    }

    #[test]
    fn status_follows_variant() {
        let res = AppError::ServiceUnavailable.into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let res = AppError::InternalError(anyhow::anyhow!("boom")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn redis_errors_convert_and_render_unavailable() {
        let err: AppError =
            redis::RedisError::from((redis::ErrorKind::IoError, "connection reset")).into();
        assert!(matches!(err, AppError::RedisError(_)));
        assert_eq!(err.code(), "SOMETHING_WENT_WRONG");
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn store_errors_do_not_leak_driver_text() {
        use http_body_util::BodyExt;

        let res = AppError::DatabaseError(anyhow::anyhow!("connection refused on 10.0.0.5:5432"))
            .into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "SOMETHING_WENT_WRONG");
        assert!(body.get("details").is_none());
        assert!(!String::from_utf8_lossy(&bytes).contains("10.0.0.5"));
    }
}
