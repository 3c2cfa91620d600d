pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    security_headers::security_headers_middleware,
    tracing::{http_request_span, request_id_middleware},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::AuthConfig;
use crate::services::{
    IdentityDirectory, IdentityProvider, JwtService, OAuthService, OAuthStateStore,
    RefreshTokenStore, RoleResolver, SessionService,
};
use crate::utils::{CookiePolicy, ACCESS_TOKEN_COOKIE};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::google_login,
        handlers::auth::google_callback,
        handlers::auth::logout,
        handlers::auth::refresh,
        handlers::auth::me,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::StatusResponse,
            dtos::auth::MeResponse,
            models::Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Google login, session cookies and rotation"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(ACCESS_TOKEN_COOKIE))),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub jwt: JwtService,
    pub directory: Arc<dyn IdentityDirectory>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub states: Arc<dyn OAuthStateStore>,
    pub oauth: OAuthService,
    pub sessions: SessionService,
    pub cookies: CookiePolicy,
}

impl AppState {
    /// Wire the services over the given adapters.
    pub fn new(
        config: AuthConfig,
        directory: Arc<dyn IdentityDirectory>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        states: Arc<dyn OAuthStateStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;
        let roles = RoleResolver::new(directory.clone());
        let sessions = SessionService::new(
            jwt.clone(),
            refresh_tokens.clone(),
            roles.clone(),
            chrono::Duration::minutes(config.jwt.rotation_window_minutes),
        );
        let oauth = OAuthService::new(
            provider,
            states.clone(),
            roles,
            sessions.clone(),
            Duration::from_secs(config.oauth.state_ttl_seconds),
        );
        let cookies = CookiePolicy::from_config(&config);

        Ok(Self {
            config,
            jwt,
            directory,
            refresh_tokens,
            states,
            oauth,
            sessions,
            cookies,
        })
    }
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "A backing store is unreachable", body = dtos::ErrorResponse)
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let checks = [
        ("directory", state.directory.health_check().await),
        ("refresh_tokens", state.refresh_tokens.health_check().await),
        ("oauth_states", state.states.health_check().await),
    ];
    for (store, result) in checks {
        if let Err(e) = result {
            tracing::error!(store, error = ?e, "Health check failed");
            return Err(AppError::ServiceUnavailable);
        }
    }

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}

/// Wrap business routes so they require an Admin access token.
///
/// `router` must already have its routes; route layers only apply to
/// existing routes.
pub fn admin_routes(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .route_layer(from_fn(middleware::require_admin))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
}

/// Wrap business routes addressed by `:event_id` so they require an Admin
/// token or staff membership of that event.
pub fn event_routes(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_event_staff,
        ))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
}

/// Build the service router. `app_routes` carries the business endpoints,
/// already wrapped with [`admin_routes`] or [`event_routes`] as needed.
pub fn build_router(state: AppState, app_routes: Router<AppState>) -> Router {
    let session_routes = Router::new()
        .route("/auth/me", get(handlers::me))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    let origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route("/auth/google", get(handlers::google_login))
        .route("/auth/google/callback", get(handlers::google_callback))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/refresh", post(handlers::refresh))
        .merge(session_routes)
        .merge(app_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(http_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
        )
}
