pub mod auth;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error envelope returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "TOKEN_MISMATCH")]
    pub code: String,
    #[schema(example = "Refresh token does not match")]
    pub message: String,
}
