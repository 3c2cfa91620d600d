use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::postgres::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::AdminEntry;

/// Read-only view over the admin and staff business tables.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Active (not soft-deleted) admin with this email.
    async fn find_admin(&self, email: &str) -> Result<Option<AdminEntry>, anyhow::Error>;
    /// Events the email is staff for; empty when none.
    async fn staff_events(&self, email: &str) -> Result<Vec<Uuid>, anyhow::Error>;
    async fn is_event_staff(&self, email: &str, event_id: Uuid) -> Result<bool, anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityDirectory for PgDirectory {
    async fn find_admin(&self, email: &str) -> Result<Option<AdminEntry>, anyhow::Error> {
        sqlx::query_as::<_, AdminEntry>(
            r#"
            SELECT id, email, full_name
            FROM admins
            WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to look up admin: {}", e))
    }

    async fn staff_events(&self, email: &str) -> Result<Vec<Uuid>, anyhow::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT event_id FROM staffs WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to look up staff events: {}", e))
    }

    async fn is_event_staff(&self, email: &str, event_id: Uuid) -> Result<bool, anyhow::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM staffs WHERE LOWER(email) = LOWER($1) AND event_id = $2
            )
            "#,
        )
        .bind(email)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to check event staff: {}", e))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Database health check failed: {}", e))?;
        Ok(())
    }
}

/// Directory held in memory; keys are lowercased emails.
#[derive(Default)]
pub struct InMemoryDirectory {
    admins: DashMap<String, AdminEntry>,
    staff: DashMap<String, HashSet<Uuid>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_admin(&self, email: &str, full_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.admins.insert(
            email.to_lowercase(),
            AdminEntry {
                id,
                email: email.to_string(),
                full_name: full_name.to_string(),
            },
        );
        id
    }

    pub fn remove_admin(&self, email: &str) {
        self.admins.remove(&email.to_lowercase());
    }

    pub fn add_staff(&self, email: &str, event_id: Uuid) {
        self.staff
            .entry(email.to_lowercase())
            .or_default()
            .insert(event_id);
    }

    pub fn remove_staff(&self, email: &str, event_id: Uuid) {
        if let Some(mut events) = self.staff.get_mut(&email.to_lowercase()) {
            events.remove(&event_id);
        }
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn find_admin(&self, email: &str) -> Result<Option<AdminEntry>, anyhow::Error> {
        Ok(self
            .admins
            .get(&email.to_lowercase())
            .map(|entry| entry.value().clone()))
    }

    async fn staff_events(&self, email: &str) -> Result<Vec<Uuid>, anyhow::Error> {
        Ok(self
            .staff
            .get(&email.to_lowercase())
            .map(|events| events.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn is_event_staff(&self, email: &str, event_id: Uuid) -> Result<bool, anyhow::Error> {
        Ok(self
            .staff
            .get(&email.to_lowercase())
            .is_some_and(|events| events.contains(&event_id)))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookups_ignore_email_case() {
        let directory = InMemoryDirectory::new();
        let event = Uuid::new_v4();
        directory.add_admin("Boss@X.com", "Boss");
        directory.add_staff("s@x.com", event);

        assert!(directory.find_admin("boss@x.com").await.unwrap().is_some());
        assert!(directory.is_event_staff("S@X.COM", event).await.unwrap());
        assert!(!directory
            .is_event_staff("s@x.com", Uuid::new_v4())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn roster_changes_are_visible_immediately() {
        let directory = InMemoryDirectory::new();
        let event = Uuid::new_v4();
        directory.add_staff("s@x.com", event);
        directory.remove_staff("s@x.com", event);

        assert!(!directory.is_event_staff("s@x.com", event).await.unwrap());
        assert!(directory.staff_events("s@x.com").await.unwrap().is_empty());
    }
}
