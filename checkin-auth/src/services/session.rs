use chrono::{Duration, Utc};
use std::sync::Arc;

use super::error::AuthError;
use super::jwt::JwtService;
use super::refresh_store::RefreshTokenStore;
use super::role::RoleResolver;
use crate::models::{ProviderProfile, RefreshTokenRecord, Role, TokenPair};

/// Result of a refresh attempt that passed validation.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// Access token still has more than the rotation window left; nothing changed.
    StillValid,
    Rotated(TokenPair),
}

/// How long after a rotation its predecessor token is treated as a lost race
/// (a second tab refreshing at the same moment) rather than as reuse.
pub const DEFAULT_REUSE_GRACE_SECONDS: i64 = 10;

/// Issues token pairs and runs the refresh rotation protocol.
#[derive(Clone)]
pub struct SessionService {
    jwt: JwtService,
    store: Arc<dyn RefreshTokenStore>,
    roles: RoleResolver,
    rotation_window: Duration,
    reuse_grace: Duration,
}

impl SessionService {
    pub fn new(
        jwt: JwtService,
        store: Arc<dyn RefreshTokenStore>,
        roles: RoleResolver,
        rotation_window: Duration,
    ) -> Self {
        Self {
            jwt,
            store,
            roles,
            rotation_window,
            reuse_grace: Duration::seconds(DEFAULT_REUSE_GRACE_SECONDS),
        }
    }

    pub fn with_reuse_grace(mut self, reuse_grace: Duration) -> Self {
        self.reuse_grace = reuse_grace;
        self
    }

    /// Mint a fresh pair and make its refresh token the only live one for the email.
    #[tracing::instrument(skip(self, profile), fields(email = %profile.email))]
    pub async fn issue(&self, profile: &ProviderProfile, role: Role) -> Result<TokenPair, AuthError> {
        let pair = self.mint(&profile.email, &profile.name, &profile.picture, role)?;

        let record =
            RefreshTokenRecord::new(&profile.email, &pair.refresh_token, pair.refresh_expires_at);
        self.store.put(&record).await.map_err(AuthError::Storage)?;

        tracing::info!(role = %role, "Session issued");
        Ok(pair)
    }

    #[tracing::instrument(skip_all)]
    pub async fn rotate(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<RefreshOutcome, AuthError> {
        let (Some(access_token), Some(refresh_token)) = (access_token, refresh_token) else {
            return Err(AuthError::Unauthenticated);
        };

        let access = self.jwt.verify_access_allow_expired(access_token)?;
        let refresh = self.jwt.verify_refresh(refresh_token)?;

        if access.email != refresh.email {
            tracing::warn!("Access and refresh tokens belong to different identities");
            return Err(AuthError::TokenMismatch);
        }

        if access.remaining(Utc::now()) > self.rotation_window {
            return Ok(RefreshOutcome::StillValid);
        }

        let email = refresh.email;
        let stored = self
            .store
            .get(&email)
            .await
            .map_err(AuthError::Storage)?
            .ok_or(AuthError::TokenNotFound)?;

        if stored.is_expired() {
            self.store.delete(&email).await.map_err(AuthError::Storage)?;
            return Err(AuthError::TokenNotFound);
        }

        if !stored.matches(refresh_token) {
            if self.lost_recent_race(refresh.iat, &stored) {
                tracing::warn!(email = %email, "Refresh token superseded by a concurrent refresh");
                return Err(AuthError::TokenMismatch);
            }
            // A superseded token came back: treat the whole session as stolen.
            tracing::warn!(email = %email, "Refresh token reuse detected, revoking session");
            self.store.delete(&email).await.map_err(AuthError::Storage)?;
            return Err(AuthError::TokenMismatch);
        }

        let role = match self.roles.resolve(&email).await {
            Ok(role) => role,
            Err(AuthError::UserNotFound) => {
                tracing::warn!(email = %email, "Grants revoked since login, ending session");
                self.store.delete(&email).await.map_err(AuthError::Storage)?;
                return Err(AuthError::Unauthorized);
            }
            Err(e) => return Err(e),
        };

        let pair = self.mint(&email, &access.name, &access.picture, role)?;
        let next = RefreshTokenRecord::new(&email, &pair.refresh_token, pair.refresh_expires_at);

        if !self
            .store
            .replace(&stored.token_hash, &next)
            .await
            .map_err(AuthError::Storage)?
        {
            tracing::warn!(email = %email, "Concurrent refresh lost the race");
            return Err(AuthError::TokenMismatch);
        }

        tracing::info!(email = %email, role = %role, "Session rotated");
        Ok(RefreshOutcome::Rotated(pair))
    }

    /// Revoke the server-side refresh record behind `refresh_token`, if it verifies.
    pub async fn end(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let Some(token) = refresh_token else {
            return Ok(());
        };

        match self.jwt.verify_refresh(token) {
            Ok(claims) => self.revoke(&claims.email).await,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unverifiable refresh cookie on logout");
                Ok(())
            }
        }
    }

    pub async fn revoke(&self, email: &str) -> Result<(), AuthError> {
        self.store.delete(email).await.map_err(AuthError::Storage)
    }

    /// The presented token predates the live record, and that record was
    /// written within the grace period.
    fn lost_recent_race(&self, presented_iat: i64, stored: &RefreshTokenRecord) -> bool {
        presented_iat <= stored.created_at.timestamp()
            && Utc::now() - stored.created_at < self.reuse_grace
    }

    fn mint(
        &self,
        email: &str,
        name: &str,
        picture: &str,
        role: Role,
    ) -> Result<TokenPair, AuthError> {
        let (access_token, access_expires_at) =
            self.jwt.issue_access(email, name, picture, role)?;
        let (refresh_token, refresh_expires_at) = self.jwt.issue_refresh(email)?;

        Ok(TokenPair {
            access_token,
            access_expires_at,
            refresh_token,
            refresh_expires_at,
        })
    }
}
