//! Shared setup for checkin-auth integration tests: in-memory stores, a stub
//! identity provider and a router with sample business routes mounted.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    routing::{delete, get},
    Json, Router,
};
use checkin_auth::{
    admin_routes, build_router,
    config::{
        AuthConfig, DatabaseConfig, Environment, GoogleOAuthConfig, JwtConfig, OAuthFlowConfig,
        RedisConfig, SecurityConfig, WebConfig,
    },
    event_routes,
    middleware::{AuthUser, EventScope},
    models::ProviderProfile,
    services::{
        AuthError, IdentityProvider, InMemoryDirectory, InMemoryRefreshTokenStore,
        InMemoryStateStore,
    },
    AppState,
};
use dashmap::DashMap;
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const WEB_URL: &str = "https://app.example.com";
pub const TEST_SECRET: &str = "integration-test-secret";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "checkin-auth".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://unused".to_string(),
        },
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_token_expiry_minutes: 60,
            refresh_token_expiry_days: 10,
            rotation_window_minutes: 5,
        },
        google: GoogleOAuthConfig {
            client_id: "test-client".to_string(),
            client_secret: "test-client-secret".to_string(),
            redirect_uri: "http://localhost:8080/auth/google/callback".to_string(),
        },
        web: WebConfig {
            web_url: WEB_URL.to_string(),
            sign_in_path: "/auth/sign-in".to_string(),
            default_landing_path: "/".to_string(),
        },
        oauth: OAuthFlowConfig {
            state_ttl_seconds: 600,
        },
        security: SecurityConfig {
            allowed_origins: vec![WEB_URL.to_string()],
        },
    }
}

/// Provider double: each registered code yields one profile.
#[derive(Default)]
pub struct StubProvider {
    profiles: DashMap<String, ProviderProfile>,
}

impl StubProvider {
    pub fn register(&self, code: &str, email: &str) {
        self.profiles.insert(
            code.to_string(),
            ProviderProfile {
                email: email.to_string(),
                name: format!("User {}", email),
                picture: format!("https://pics.example.com/{}", email),
                verified_email: Some(true),
            },
        );
    }

    pub fn register_unverified(&self, code: &str, email: &str) {
        self.register(code, email);
        if let Some(mut profile) = self.profiles.get_mut(code) {
            profile.verified_email = Some(false);
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for StubProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://accounts.test/auth?client_id=test-client&state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        if self.profiles.contains_key(code) {
            Ok(format!("provider-token:{}", code))
        } else {
            Err(AuthError::ProviderExchange("unknown code".to_string()))
        }
    }

    async fn fetch_profile(&self, provider_token: &str) -> Result<ProviderProfile, AuthError> {
        provider_token
            .strip_prefix("provider-token:")
            .and_then(|code| self.profiles.get(code))
            .map(|p| p.value().clone())
            .ok_or_else(|| AuthError::ProviderProfile("unknown token".to_string()))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub directory: Arc<InMemoryDirectory>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenStore>,
    pub states: Arc<InMemoryStateStore>,
    pub provider: Arc<StubProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let refresh_tokens = Arc::new(InMemoryRefreshTokenStore::new());
        let states = Arc::new(InMemoryStateStore::new());
        let provider = Arc::new(StubProvider::default());

        let state = AppState::new(
            config,
            directory.clone(),
            refresh_tokens.clone(),
            states.clone(),
            provider.clone(),
        )
        .expect("state");

        let admin = admin_routes(
            Router::new().route("/admins", delete(delete_admins)),
            &state,
        );
        let events = event_routes(
            Router::new().route("/events/:event_id/participants", get(list_participants)),
            &state,
        );

        let router = build_router(state.clone(), admin.merge(events));

        Self {
            state,
            router,
            directory,
            refresh_tokens,
            states,
            provider,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("oneshot")
    }

    /// Run `/auth/google` then the callback for `email`; returns the callback response.
    pub async fn login(&self, email: &str, redirect_to: Option<&str>) -> Response<Body> {
        let uri = match redirect_to {
            Some(path) => format!("/auth/google?redirect_to={}", urlencoding::encode(path)),
            None => "/auth/google".to_string(),
        };
        let start = self.send(get_request(&uri, None)).await;
        assert_eq!(start.status(), StatusCode::TEMPORARY_REDIRECT);
        let state = query_param(&location(&start), "state").expect("state param");

        let code = format!("code-{}", Uuid::new_v4());
        self.provider.register(&code, email);

        self.send(get_request(
            &format!("/auth/google/callback?code={}&state={}", code, state),
            None,
        ))
        .await
    }

    /// Log in and return `(accessToken, refreshToken)` cookie values.
    pub async fn session_for(&self, email: &str) -> (String, String) {
        let response = self.login(email, None).await;
        let cookies = set_cookies(&response);
        (
            cookies.get("accessToken").cloned().expect("access cookie"),
            cookies.get("refreshToken").cloned().expect("refresh cookie"),
        )
    }
}

async fn delete_admins(
    AuthUser(claims): AuthUser,
    Json(ids): Json<Vec<Uuid>>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "deleted": ids.len(), "by": claims.email }))
}

async fn list_participants(
    axum::extract::Path(scope): axum::extract::Path<EventScope>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "event_id": scope.event_id, "participants": [] }))
}

pub fn get_request(uri: &str, cookies: Option<&str>) -> Request<Body> {
    request("GET", uri, cookies, Body::empty())
}

pub fn post_request(uri: &str, cookies: Option<&str>) -> Request<Body> {
    request("POST", uri, cookies, Body::empty())
}

pub fn request(method: &str, uri: &str, cookies: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .expect("request")
}

pub fn cookie_header(access: &str, refresh: &str) -> String {
    format!("accessToken={}; refreshToken={}", access, refresh)
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Name -> value for every `Set-Cookie` header.
pub fn set_cookies(response: &Response<Body>) -> HashMap<String, String> {
    set_cookie_lines(response)
        .iter()
        .filter_map(|line| {
            let pair = line.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

pub fn set_cookie_lines(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
