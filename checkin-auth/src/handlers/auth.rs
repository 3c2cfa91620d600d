use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    dtos::{
        auth::{CallbackQuery, LoginQuery, MeResponse, StatusResponse},
        ErrorResponse,
    },
    middleware::AuthUser,
    services::{AuthError, RefreshOutcome},
    utils::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    AppState,
};

/// Start Google login
#[utoipa::path(
    get,
    path = "/auth/google",
    params(LoginQuery),
    responses(
        (status = 307, description = "Redirect to Google consent screen"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn google_login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, AuthError> {
    let url = state.oauth.begin_login(query.redirect_to.as_deref()).await?;
    Ok(Redirect::temporary(&url))
}

/// Google OAuth callback
///
/// Always answers with a redirect to the web app: the landing page with
/// session cookies set, or the sign-in page with an `error` indicator.
#[utoipa::path(
    get,
    path = "/auth/google/callback",
    params(CallbackQuery),
    responses(
        (status = 307, description = "Redirect to the web app")
    ),
    tag = "Authentication"
)]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error {
        tracing::warn!(error = %error, "Google OAuth error");
        if let Err(e) = state.oauth.abandon(query.state.as_deref()).await {
            tracing::error!(error = %e, "Failed to discard OAuth state");
        }
        return sign_in_redirect(&state, "access-denied").into_response();
    }

    let Some(oauth_state) = query.state else {
        return sign_in_redirect(&state, AuthError::InvalidState.sign_in_slug()).into_response();
    };

    let Some(code) = query.code else {
        if let Err(e) = state.oauth.abandon(Some(&oauth_state)).await {
            tracing::error!(error = %e, "Failed to discard OAuth state");
        }
        let err = AuthError::ProviderExchange("Missing authorization code".to_string());
        return sign_in_redirect(&state, err.sign_in_slug()).into_response();
    };

    match state.oauth.handle_callback(&code, &oauth_state).await {
        Ok(outcome) => {
            let [access, refresh] = state.cookies.session_cookies(&outcome.tokens);
            let path = outcome
                .redirect_to
                .unwrap_or_else(|| state.config.web.default_landing_path.clone());
            let target = format!("{}{}", state.config.web.web_url, path);

            (jar.add(access).add(refresh), Redirect::temporary(&target)).into_response()
        }
        Err(e) => {
            if e.status().is_server_error() {
                tracing::error!(error = %e, code = e.code(), "Login failed");
            } else {
                tracing::warn!(error = %e, code = e.code(), "Login rejected");
            }
            sign_in_redirect(&state, e.sign_in_slug()).into_response()
        }
    }
}

/// Logout
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Cookies cleared", body = StatusResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<StatusResponse>), AuthError> {
    state
        .sessions
        .end(jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value()))
        .await?;

    let [access, refresh] = state.cookies.cleared_cookies();
    Ok((
        jar.add(access).add(refresh),
        Json(StatusResponse::new("SUCCESS", "Logout success")),
    ))
}

/// Rotate the session cookies
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated (SUCCESS) or nothing to do (TOKEN_STILL_VALID)", body = StatusResponse),
        (status = 401, description = "Missing, invalid or superseded tokens", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AuthError> {
    let outcome = state
        .sessions
        .rotate(
            jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value()),
            jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value()),
        )
        .await?;

    match outcome {
        RefreshOutcome::StillValid => {
            Ok(Json(StatusResponse::new("TOKEN_STILL_VALID", "Token still valid")).into_response())
        }
        RefreshOutcome::Rotated(tokens) => {
            let [access, refresh] = state.cookies.session_cookies(&tokens);
            Ok((
                jar.add(access).add(refresh),
                Json(StatusResponse::new("SUCCESS", "Refresh token success")),
            )
                .into_response())
        }
    }
}

/// Current session claims
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Claims of the presented access token", body = MeResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("cookie_auth" = []))
)]
pub async fn me(AuthUser(claims): AuthUser) -> Json<MeResponse> {
    Json(MeResponse::from(claims))
}

fn sign_in_redirect(state: &AppState, slug: &str) -> Redirect {
    Redirect::temporary(&format!(
        "{}{}?error={}",
        state.config.web.web_url,
        state.config.web.sign_in_path,
        urlencoding::encode(slug)
    ))
}
