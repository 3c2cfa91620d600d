use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use service_core::error::ErrorResponse;
use thiserror::Error;

use super::jwt::TokenError;

/// Failures of the login, session and authorization flows.
///
/// Each variant maps to one HTTP status and one machine-readable code.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth state is unknown, expired or already used")]
    InvalidState,

    #[error("Identity provider code exchange failed: {0}")]
    ProviderExchange(String),

    #[error("Identity provider profile lookup failed: {0}")]
    ProviderProfile(String),

    #[error("User not found in admin or staff directory")]
    UserNotFound,

    #[error("You are not authorized")]
    Unauthorized,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Refresh token not found")]
    TokenNotFound,

    #[error("Refresh token does not match")]
    TokenMismatch,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Directory error: {0}")]
    Directory(anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidState
            | AuthError::UserNotFound
            | AuthError::Unauthorized
            | AuthError::Unauthenticated
            | AuthError::TokenNotFound
            | AuthError::TokenMismatch => StatusCode::UNAUTHORIZED,
            AuthError::Token(TokenError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Token(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::ProviderExchange(_) | AuthError::ProviderProfile(_) => {
                StatusCode::BAD_GATEWAY
            }
            AuthError::Storage(_) | AuthError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidState => "INVALID_STATE",
            AuthError::ProviderExchange(_) => "PROVIDER_EXCHANGE_FAILURE",
            AuthError::ProviderProfile(_) => "PROVIDER_PROFILE_FAILURE",
            AuthError::UserNotFound | AuthError::Unauthorized => "UNAUTHORIZED",
            AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::TokenNotFound => "TOKEN_NOT_FOUND",
            AuthError::TokenMismatch => "TOKEN_MISMATCH",
            AuthError::Token(e) => e.code(),
            AuthError::Storage(_) | AuthError::Directory(_) => "SOMETHING_WENT_WRONG",
        }
    }

    /// Error indicator appended to the sign-in page URL after a failed login.
    pub fn sign_in_slug(&self) -> &'static str {
        match self {
            AuthError::UserNotFound | AuthError::Unauthorized => "unauthorized",
            AuthError::InvalidState => "invalid-state",
            _ => "something-went-wrong",
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Upstream and infrastructure detail stays in the logs.
            AuthError::ProviderExchange(_) | AuthError::ProviderProfile(_) => {
                "Identity provider unavailable".to_string()
            }
            AuthError::Token(TokenError::Signing(_))
            | AuthError::Storage(_)
            | AuthError::Directory(_) => "Something went wrong".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        }

        ErrorResponse::new(self.code(), self.public_message()).with_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_failures_are_unauthorized() {
        for err in [
            AuthError::TokenNotFound,
            AuthError::TokenMismatch,
            AuthError::Unauthenticated,
            AuthError::Token(TokenError::Expired),
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(AuthError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn codes_are_distinct_for_rotation_failures() {
        assert_eq!(AuthError::TokenNotFound.code(), "TOKEN_NOT_FOUND");
        assert_eq!(AuthError::TokenMismatch.code(), "TOKEN_MISMATCH");
        assert_eq!(
            AuthError::Token(TokenError::InvalidSignature).code(),
            "INVALID_TOKEN"
        );
    }

    #[test]
    fn user_not_found_reads_as_unauthorized() {
        assert_eq!(AuthError::UserNotFound.code(), "UNAUTHORIZED");
        assert_eq!(AuthError::UserNotFound.sign_in_slug(), "unauthorized");
        assert_eq!(
            AuthError::ProviderExchange("down".into()).sign_in_slug(),
            "something-went-wrong"
        );
    }
}
