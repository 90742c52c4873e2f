//! Durable client registry backing the Token-Bucket Limiter.
//!
//! A local SQLite table, `clients(client_ip PRIMARY KEY, capacity,
//! refill_every)`, upserted on registration and deleted on
//! de-registration. Consulted at startup only, to repopulate the
//! in-memory bucket map; admission decisions never touch the store.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error::LimiterError;

/// One row of the durable registry.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub ip: String,
    pub capacity: u32,
    pub refill_every: Duration,
}

/// Capability the Limiter needs from its durable registry.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn upsert(&self, ip: &str, capacity: u32, refill_every: Duration) -> Result<(), LimiterError>;
    async fn delete(&self, ip: &str) -> Result<(), LimiterError>;
    async fn load_all(&self) -> Result<Vec<ClientRecord>, LimiterError>;
}

/// SQLite-backed implementation.
pub struct SqliteClientStore {
    pool: SqlitePool,
}

impl SqliteClientStore {
    /// Open (creating if necessary) the SQLite database at `path` and
    /// ensure the `clients` table exists.
    pub async fn connect(path: &Path) -> Result<Self, sqlx::Error> {
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS clients (
                client_ip TEXT PRIMARY KEY,
                capacity INTEGER NOT NULL,
                refill_every INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ClientStore for SqliteClientStore {
    async fn upsert(&self, ip: &str, capacity: u32, refill_every: Duration) -> Result<(), LimiterError> {
        sqlx::query(
            "INSERT INTO clients (client_ip, capacity, refill_every)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(client_ip) DO UPDATE SET
                capacity = excluded.capacity,
                refill_every = excluded.refill_every",
        )
        .bind(ip)
        .bind(capacity as i64)
        .bind(refill_every.as_nanos() as i64)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| LimiterError::AddIp(e.to_string()))
    }

    async fn delete(&self, ip: &str) -> Result<(), LimiterError> {
        let result = sqlx::query("DELETE FROM clients WHERE client_ip = ?1")
            .bind(ip)
            .execute(&self.pool)
            .await
            .map_err(|e| LimiterError::RemoveIp(e.to_string()))?;

        if result.rows_affected() == 0 {
            Err(LimiterError::RemoveIp(format!("{ip} not registered")))
        } else {
            Ok(())
        }
    }

    async fn load_all(&self) -> Result<Vec<ClientRecord>, LimiterError> {
        let rows: Vec<(String, i64, i64)> =
            sqlx::query_as("SELECT client_ip, capacity, refill_every FROM clients")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| LimiterError::AddIp(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(ip, capacity, refill_every)| ClientRecord {
                ip,
                capacity: capacity as u32,
                refill_every: Duration::from_nanos(refill_every as u64),
            })
            .collect())
    }
}

/// In-memory registry used in tests that don't need a real database.
#[derive(Default)]
pub struct InMemoryClientStore {
    rows: std::sync::Mutex<std::collections::HashMap<String, (u32, Duration)>>,
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn upsert(&self, ip: &str, capacity: u32, refill_every: Duration) -> Result<(), LimiterError> {
        self.rows
            .lock()
            .expect("in-memory store mutex poisoned")
            .insert(ip.to_string(), (capacity, refill_every));
        Ok(())
    }

    async fn delete(&self, ip: &str) -> Result<(), LimiterError> {
        let removed = self
            .rows
            .lock()
            .expect("in-memory store mutex poisoned")
            .remove(ip)
            .is_some();
        if removed {
            Ok(())
        } else {
            Err(LimiterError::RemoveIp(format!("{ip} not registered")))
        }
    }

    async fn load_all(&self) -> Result<Vec<ClientRecord>, LimiterError> {
        Ok(self
            .rows
            .lock()
            .expect("in-memory store mutex poisoned")
            .iter()
            .map(|(ip, (capacity, refill_every))| ClientRecord {
                ip: ip.clone(),
                capacity: *capacity,
                refill_every: *refill_every,
            })
            .collect())
    }
}
