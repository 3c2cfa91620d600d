use std::sync::Arc;

use super::directory::IdentityDirectory;
use super::error::AuthError;
use crate::models::Role;

/// Derives the single authorization role for an email from the directory.
#[derive(Clone)]
pub struct RoleResolver {
    directory: Arc<dyn IdentityDirectory>,
}

impl RoleResolver {
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }

    /// Admin wins over Staff; an email in neither directory is `UserNotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, email: &str) -> Result<Role, AuthError> {
        if self
            .directory
            .find_admin(email)
            .await
            .map_err(AuthError::Directory)?
            .is_some()
        {
            return Ok(Role::Admin);
        }

        let events = self
            .directory
            .staff_events(email)
            .await
            .map_err(AuthError::Directory)?;

        if !events.is_empty() {
            tracing::debug!(event_count = events.len(), "Resolved staff role");
            return Ok(Role::Staff);
        }

        Err(AuthError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::directory::InMemoryDirectory;
    use uuid::Uuid;

    fn resolver_with(directory: InMemoryDirectory) -> RoleResolver {
        RoleResolver::new(Arc::new(directory))
    }

    #[tokio::test]
    async fn admin_takes_precedence_over_staff() {
        let directory = InMemoryDirectory::new();
        directory.add_admin("both@x.com", "Both");
        directory.add_staff("both@x.com", Uuid::new_v4());

        let role = resolver_with(directory).resolve("both@x.com").await.unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[tokio::test]
    async fn staff_with_any_event_is_staff() {
        let directory = InMemoryDirectory::new();
        directory.add_staff("s@x.com", Uuid::new_v4());

        let role = resolver_with(directory).resolve("s@x.com").await.unwrap();
        assert_eq!(role, Role::Staff);
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let result = resolver_with(InMemoryDirectory::new())
            .resolve("nobody@x.com")
            .await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }
}
