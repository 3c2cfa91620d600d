use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::sync::Arc;
use std::time::Duration;

use super::error::AuthError;
use super::oauth_state::OAuthStateStore;
use super::provider::IdentityProvider;
use super::role::RoleResolver;
use super::session::SessionService;
use crate::models::{PendingLogin, Role, TokenPair};

/// A login that made it through the callback.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub email: String,
    pub role: Role,
    pub tokens: TokenPair,
    /// Site-relative path stashed at login start, if any.
    pub redirect_to: Option<String>,
}

/// Drives the third-party login round trip: state issuance, callback
/// validation, role resolution and session issuance.
#[derive(Clone)]
pub struct OAuthService {
    provider: Arc<dyn IdentityProvider>,
    states: Arc<dyn OAuthStateStore>,
    roles: RoleResolver,
    sessions: SessionService,
    state_ttl: Duration,
}

impl OAuthService {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        states: Arc<dyn OAuthStateStore>,
        roles: RoleResolver,
        sessions: SessionService,
        state_ttl: Duration,
    ) -> Self {
        Self {
            provider,
            states,
            roles,
            sessions,
            state_ttl,
        }
    }

    /// Record a fresh state and return the provider URL to send the browser to.
    #[tracing::instrument(skip(self))]
    pub async fn begin_login(&self, redirect_to: Option<&str>) -> Result<String, AuthError> {
        let redirect_to = redirect_to.and_then(|path| {
            let safe = safe_redirect_path(path);
            if safe.is_none() {
                tracing::warn!(redirect_to = %path, "Ignoring non-relative post-login path");
            }
            safe
        });

        let state = generate_state();
        self.states
            .issue(&state, &PendingLogin::new(redirect_to), self.state_ttl)
            .await
            .map_err(AuthError::Storage)?;

        Ok(self.provider.authorization_url(&state))
    }

    #[tracing::instrument(skip_all)]
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<LoginOutcome, AuthError> {
        // Consumed up front so the value is dead whatever happens next.
        let pending = self
            .states
            .consume(state)
            .await
            .map_err(AuthError::Storage)?
            .ok_or_else(|| {
                tracing::warn!("Unknown, expired or replayed OAuth state");
                AuthError::InvalidState
            })?;
        tracing::debug!(
            state_age_ms = pending.age(chrono::Utc::now()).num_milliseconds(),
            "OAuth state consumed"
        );

        let provider_token = self.provider.exchange_code(code).await?;
        let profile = self.provider.fetch_profile(&provider_token).await?;

        if profile.verified_email == Some(false) {
            tracing::warn!(email = %profile.email, "Provider email is not verified");
            return Err(AuthError::Unauthorized);
        }

        let role = self.roles.resolve(&profile.email).await.map_err(|e| match e {
            AuthError::UserNotFound => {
                tracing::warn!(email = %profile.email, "Login denied: no admin or staff grant");
                AuthError::Unauthorized
            }
            other => other,
        })?;

        let tokens = self.sessions.issue(&profile, role).await?;

        tracing::info!(email = %profile.email, role = %role, "Login succeeded");
        Ok(LoginOutcome {
            email: profile.email,
            role,
            tokens,
            redirect_to: pending.redirect_to,
        })
    }

    /// Burn a state the provider sent back with an error instead of a code.
    pub async fn abandon(&self, state: Option<&str>) -> Result<(), AuthError> {
        if let Some(state) = state {
            self.states.consume(state).await.map_err(AuthError::Storage)?;
        }
        Ok(())
    }
}

fn generate_state() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

/// Accepts only same-site absolute paths (`/x`), never `//host` or `\`.
pub fn safe_redirect_path(path: &str) -> Option<String> {
    let path = path.trim();
    if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') {
        Some(path.to_string())
    } else {
        None
    }
}
