use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::postgres::PgPool;

use crate::models::RefreshTokenRecord;

/// Durable owner of the one live refresh token per email.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn get(&self, email: &str) -> Result<Option<RefreshTokenRecord>, anyhow::Error>;
    /// Overwrites any existing record for the same email.
    async fn put(&self, record: &RefreshTokenRecord) -> Result<(), anyhow::Error>;
    /// Idempotent: a missing record is not an error.
    async fn delete(&self, email: &str) -> Result<(), anyhow::Error>;
    /// Swap in `next` only if the stored hash still equals `expected_hash`.
    /// Returns `false` when another writer got there first.
    async fn replace(
        &self,
        expected_hash: &str,
        next: &RefreshTokenRecord,
    ) -> Result<bool, anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn get(&self, email: &str) -> Result<Option<RefreshTokenRecord>, anyhow::Error> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT email, token_hash, expires_at, created_at FROM refresh_tokens WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load refresh token: {}", e))
    }

    async fn put(&self, record: &RefreshTokenRecord) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (email, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&record.email)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to store refresh token: {}", e))?;
        Ok(())
    }

    async fn delete(&self, email: &str) -> Result<(), anyhow::Error> {
        sqlx::query("DELETE FROM refresh_tokens WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete refresh token: {}", e))?;
        Ok(())
    }

    async fn replace(
        &self,
        expected_hash: &str,
        next: &RefreshTokenRecord,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET token_hash = $3, expires_at = $4, created_at = $5
            WHERE email = $1 AND token_hash = $2
            "#,
        )
        .bind(&next.email)
        .bind(expected_hash)
        .bind(&next.token_hash)
        .bind(next.expires_at)
        .bind(next.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to rotate refresh token: {}", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Database health check failed: {}", e))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    records: DashMap<String, RefreshTokenRecord>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn get(&self, email: &str) -> Result<Option<RefreshTokenRecord>, anyhow::Error> {
        Ok(self.records.get(email).map(|r| r.value().clone()))
    }

    async fn put(&self, record: &RefreshTokenRecord) -> Result<(), anyhow::Error> {
        self.records.insert(record.email.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, email: &str) -> Result<(), anyhow::Error> {
        self.records.remove(email);
        Ok(())
    }

    async fn replace(
        &self,
        expected_hash: &str,
        next: &RefreshTokenRecord,
    ) -> Result<bool, anyhow::Error> {
        // The shard lock held by get_mut makes compare and write one step.
        match self.records.get_mut(&next.email) {
            Some(mut current) if current.token_hash == expected_hash => {
                *current = next.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
