use async_trait::async_trait;
use dashmap::DashMap;
use redis::{aio::ConnectionManager, Client};
use service_core::error::AppError;
use std::time::{Duration, Instant};

use crate::models::PendingLogin;

const STATE_KEY_PREFIX: &str = "oauth_state:";

/// One-time OAuth state values with a per-entry TTL.
///
/// `consume` is an atomic check-and-delete: for concurrent callers presenting
/// the same value at most one gets `Some`.
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    async fn issue(
        &self,
        state: &str,
        pending: &PendingLogin,
        ttl: Duration,
    ) -> Result<(), anyhow::Error>;
    async fn consume(&self, state: &str) -> Result<Option<PendingLogin>, anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct RedisStateStore {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisStateStore {
    pub async fn new(config: &crate::config::RedisConfig) -> Result<Self, AppError> {
        tracing::info!("Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            AppError::RedisError(e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

#[async_trait]
impl OAuthStateStore for RedisStateStore {
    async fn issue(
        &self,
        state: &str,
        pending: &PendingLogin,
        ttl: Duration,
    ) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let key = format!("{}{}", STATE_KEY_PREFIX, state);
        let value = serde_json::to_string(pending)?;

        let stored: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to store OAuth state: {}", e))?;

        match stored {
            Some(_) => Ok(()),
            None => Err(anyhow::anyhow!("OAuth state collision")),
        }
    }

    async fn consume(&self, state: &str) -> Result<Option<PendingLogin>, anyhow::Error> {
        let mut conn = self.manager.clone();
        let key = format!("{}{}", STATE_KEY_PREFIX, state);

        let value: Option<String> = redis::cmd("GETDEL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to consume OAuth state: {}", e))?;

        value
            .map(|v| serde_json::from_str(&v))
            .transpose()
            .map_err(|e| anyhow::anyhow!("Corrupt OAuth state record: {}", e))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

#[derive(Default)]
pub struct InMemoryStateStore {
    entries: DashMap<String, (PendingLogin, Instant)>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, (_, deadline)| *deadline > now);
    }
}

#[async_trait]
impl OAuthStateStore for InMemoryStateStore {
    async fn issue(
        &self,
        state: &str,
        pending: &PendingLogin,
        ttl: Duration,
    ) -> Result<(), anyhow::Error> {
        self.purge_expired();

        match self.entries.entry(state.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(anyhow::anyhow!("OAuth state collision"))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert((pending.clone(), Instant::now() + ttl));
                Ok(())
            }
        }
    }

    async fn consume(&self, state: &str) -> Result<Option<PendingLogin>, anyhow::Error> {
        Ok(self
            .entries
            .remove(state)
            .filter(|(_, (_, deadline))| *deadline > Instant::now())
            .map(|(_, (pending, _))| pending))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
