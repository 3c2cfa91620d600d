use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::Role;
use crate::services::AccessClaims;

#[derive(Debug, Deserialize, IntoParams)]
pub struct LoginQuery {
    /// Site-relative path to land on after login.
    #[param(example = "/events")]
    pub redirect_to: Option<String>,
}

/// Query parameters Google appends when redirecting back.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user denied consent.
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "SUCCESS")]
    pub code: String,
    #[schema(example = "Refresh token success")]
    pub message: String,
}

impl StatusResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    #[schema(example = "staff@example.com")]
    pub email: String,
    pub name: String,
    pub picture: String,
    pub role: Role,
    /// Access token expiry (Unix timestamp).
    pub exp: i64,
}

impl From<AccessClaims> for MeResponse {
    fn from(claims: AccessClaims) -> Self {
        Self {
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
            role: claims.role,
            exp: claims.exp,
        }
    }
}
