use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Tampered, garbage, or signed with another key.
    #[error("Invalid token signature")]
    InvalidSignature,
    /// Valid signature, expiry in the past.
    #[error("Token expired")]
    Expired,
    /// Signature checks out but required claims are missing or of the wrong kind.
    #[error("Token claims are malformed")]
    Malformed,
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl TokenError {
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidSignature => "INVALID_TOKEN",
            TokenError::Expired => "TOKEN_EXPIRED",
            TokenError::Malformed => "MALFORMED_TOKEN",
            TokenError::Signing(_) => "SIGNING_ERROR",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => TokenError::Malformed,
            _ => TokenError::InvalidSignature,
        }
    }
}

/// Claims carried by access tokens (short-lived)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub email: String,
    pub name: String,
    pub picture: String,
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
}

/// Claims carried by refresh tokens (long-lived)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique per issuance, so a rotated token never equals its predecessor.
    pub jti: String,
}

/// Every signed token is one of these; the `kind` tag keeps a refresh token
/// from ever being accepted where an access token is expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TokenClaims {
    Access(AccessClaims),
    Refresh(RefreshClaims),
}

impl AccessClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp_to_utc(self.exp)
    }

    /// Time left before expiry; negative once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at() - now
    }
}

fn timestamp_to_utc(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, TokenError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| TokenError::Signing("token lifetime overflows the calendar".to_string()))
}

/// Signs and verifies access and refresh tokens (HS256). Pure: no I/O.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        if config.secret.is_empty() {
            return Err(anyhow::anyhow!("JWT signing secret is empty"));
        }

        tracing::info!("JWT service initialized with HS256 secret");

        let access_ttl = Duration::try_minutes(config.access_token_expiry_minutes)
            .ok_or_else(|| anyhow::anyhow!("Access token lifetime is out of range"))?;
        let refresh_ttl = Duration::try_days(config.refresh_token_expiry_days)
            .ok_or_else(|| anyhow::anyhow!("Refresh token lifetime is out of range"))?;

        Ok(Self::with_lifetimes(
            config.secret.as_bytes(),
            access_ttl,
            refresh_ttl,
        ))
    }

    pub fn with_lifetimes(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue_access(
        &self,
        email: &str,
        name: &str,
        picture: &str,
        role: Role,
    ) -> Result<(String, DateTime<Utc>), TokenError> {
        let now = Utc::now();
        let exp = expiry(now, self.access_ttl)?;

        let claims = TokenClaims::Access(AccessClaims {
            email: email.to_string(),
            name: name.to_string(),
            picture: picture.to_string(),
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        });

        Ok((self.sign(&claims)?, timestamp_to_utc(exp.timestamp())))
    }

    pub fn issue_refresh(&self, email: &str) -> Result<(String, DateTime<Utc>), TokenError> {
        let now = Utc::now();
        let exp = expiry(now, self.refresh_ttl)?;

        let claims = TokenClaims::Refresh(RefreshClaims {
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        });

        Ok((self.sign(&claims)?, timestamp_to_utc(exp.timestamp())))
    }

    /// Verify signature and expiry of any token.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode(token, true)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        match self.verify(token)? {
            TokenClaims::Access(claims) => Ok(claims),
            TokenClaims::Refresh(_) => Err(TokenError::Malformed),
        }
    }

    /// Signature-only check, used by the refresh protocol where the access
    /// token is expected to be close to or past its expiry.
    pub fn verify_access_allow_expired(&self, token: &str) -> Result<AccessClaims, TokenError> {
        match self.decode(token, false)? {
            TokenClaims::Access(claims) => Ok(claims),
            TokenClaims::Refresh(_) => Err(TokenError::Malformed),
        }
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        match self.verify(token)? {
            TokenClaims::Refresh(claims) => Ok(claims),
            TokenClaims::Access(_) => Err(TokenError::Malformed),
        }
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn decode(&self, token: &str, validate_exp: bool) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}
