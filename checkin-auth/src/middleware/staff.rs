use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::services::AuthError;
use crate::AppState;

/// Path parameters of event-scoped routes.
#[derive(Debug, Deserialize)]
pub struct EventScope {
    pub event_id: Uuid,
}

/// Staff-or-admin gate for `/:event_id` routes. Admins pass; staff must be
/// on that event's roster, checked against the directory on every request.
pub async fn require_event_staff(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(scope): Path<EventScope>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if claims.role.is_admin() {
        return Ok(next.run(request).await);
    }

    let on_roster = state
        .directory
        .is_event_staff(&claims.email, scope.event_id)
        .await
        .map_err(AuthError::Directory)?;

    if !on_roster {
        tracing::warn!(
            email = %claims.email,
            event_id = %scope.event_id,
            "Event route refused: not on staff roster"
        );
        return Err(AuthError::Forbidden);
    }

    Ok(next.run(request).await)
}
