use axum::{extract::Request, middleware::Next, response::Response};

use super::auth::AuthUser;
use crate::services::AuthError;

/// Admin gate. Must run after `auth_middleware`.
pub async fn require_admin(
    AuthUser(claims): AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !claims.role.is_admin() {
        tracing::warn!(email = %claims.email, role = %claims.role, "Admin route refused");
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(request).await)
}
