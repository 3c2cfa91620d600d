use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::services::{AccessClaims, AuthError};
use crate::utils::ACCESS_TOKEN_COOKIE;
use crate::AppState;

/// Claim extraction: verify the `accessToken` cookie and attach its claims
/// to the request. Missing, invalid or expired tokens are `Unauthenticated`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::Unauthenticated)?;

    let claims = state.jwt.verify_access(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AuthError::Unauthenticated
    })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor to easily get claims in handlers
#[derive(Debug, Clone)]
pub struct AuthUser(pub AccessClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessClaims>()
            .cloned()
            .map(AuthUser)
            .ok_or(AuthError::Unauthenticated)
    }
}
