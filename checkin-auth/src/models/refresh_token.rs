use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Server-side record of the single live refresh token for an email.
///
/// Only the SHA-256 of the signed token is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub email: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(email: impl Into<String>, token: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            token_hash: Self::hash_token(token),
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Hash a token using SHA-256
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether `token` is exactly the signed string this record was made from.
    pub fn matches(&self, token: &str) -> bool {
        let presented = Self::hash_token(token);
        presented
            .as_bytes()
            .ct_eq(self.token_hash.as_bytes())
            .into()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn stores_hash_not_token() {
        let record = RefreshTokenRecord::new("a@x.com", "token_abc", Utc::now());
        assert_ne!(record.token_hash, "token_abc");
        assert_eq!(record.token_hash.len(), 64);
    }

    #[test]
    fn matches_only_the_original_token() {
        let record = RefreshTokenRecord::new("a@x.com", "token_abc", Utc::now());
        assert!(record.matches("token_abc"));
        assert!(!record.matches("token_abd"));
        assert!(!record.matches(""));
    }

    #[test]
    fn expiry() {
        let mut record =
            RefreshTokenRecord::new("a@x.com", "t", Utc::now() + Duration::days(10));
        assert!(!record.is_expired());

        record.expires_at = Utc::now() - Duration::seconds(1);
        assert!(record.is_expired());
    }
}
