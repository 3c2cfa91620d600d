use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Authorization role embedded in access tokens.
///
/// Derived from the identity directory at login and on every rotation;
/// never stored on the account itself. An email with neither grant has no
/// role at all and is refused a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access to admin management and every event.
    Admin,
    /// Access only to the events the staff roster associates with the email.
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
