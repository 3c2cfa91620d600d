use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile returned by the external identity provider after a code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: String,
    /// `None` when the provider does not report verification.
    #[serde(default)]
    pub verified_email: Option<bool>,
}

/// Active administrator entry from the business directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminEntry {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
}

/// Signed access/refresh pair handed to the transport layer as cookies.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// What a one-time OAuth state value stands for until it is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    /// Site-relative path to land on after login.
    pub redirect_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingLogin {
    pub fn new(redirect_to: Option<String>) -> Self {
        Self {
            redirect_to,
            created_at: Utc::now(),
        }
    }

    /// How long the login has been pending as of `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_login_age_survives_serialization() {
        let pending = PendingLogin::new(None);
        let stored = serde_json::to_string(&pending).unwrap();
        let restored: PendingLogin = serde_json::from_str(&stored).unwrap();

        let later = restored.created_at + chrono::Duration::seconds(42);
        assert_eq!(restored.age(later), chrono::Duration::seconds(42));
    }
}
