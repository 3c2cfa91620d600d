//! External identity provider (Google OAuth 2.0).

use async_trait::async_trait;
use serde::Deserialize;

use super::error::AuthError;
use crate::config::GoogleOAuthConfig;
use crate::models::ProviderProfile;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GOOGLE_SCOPES: &str =
    "https://www.googleapis.com/auth/userinfo.email https://www.googleapis.com/auth/userinfo.profile";

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to, with `state` embedded.
    fn authorization_url(&self, state: &str) -> String;
    /// Trade the callback `code` for a provider access token.
    async fn exchange_code(&self, code: &str) -> Result<String, AuthError>;
    async fn fetch_profile(&self, provider_token: &str) -> Result<ProviderProfile, AuthError>;
}

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

/// Response from Google token endpoint.
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Clone)]
pub struct GoogleProvider {
    client: reqwest::Client,
    config: GoogleOAuthConfig,
    endpoints: GoogleEndpoints,
}

impl GoogleProvider {
    pub fn new(config: GoogleOAuthConfig) -> Self {
        Self::with_endpoints(config, GoogleEndpoints::default())
    }

    pub fn with_endpoints(config: GoogleOAuthConfig, endpoints: GoogleEndpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            endpoints,
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&prompt=select_account",
            self.endpoints.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(GOOGLE_SCOPES),
            urlencoding::encode(state),
        )
    }

    #[tracing::instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .post(&self.endpoints.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ProviderExchange(format!("Failed to contact Google: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, error = %error_text, "Google token exchange failed");
            return Err(AuthError::ProviderExchange(format!(
                "Google token endpoint returned {}",
                status
            )));
        }

        let tokens = response.json::<GoogleTokenResponse>().await.map_err(|e| {
            AuthError::ProviderExchange(format!("Failed to parse Google response: {}", e))
        })?;

        Ok(tokens.access_token)
    }

    #[tracing::instrument(skip_all)]
    async fn fetch_profile(&self, provider_token: &str) -> Result<ProviderProfile, AuthError> {
        let response = self
            .client
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(provider_token)
            .send()
            .await
            .map_err(|e| AuthError::ProviderProfile(format!("Failed to contact Google: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, "Google userinfo request failed");
            return Err(AuthError::ProviderProfile(format!(
                "Google userinfo endpoint returned {}",
                status
            )));
        }

        response
            .json::<ProviderProfile>()
            .await
            .map_err(|e| AuthError::ProviderProfile(format!("Failed to parse profile: {}", e)))
    }
}
