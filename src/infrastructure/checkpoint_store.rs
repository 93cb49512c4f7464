//! Persisted completion time of the last full sweep

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Mutex;

/// Name of the scheduler's checkpoint row
pub const SWEEP_CHECKPOINT: &str = "range_sweep";

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self) -> Result<Option<DateTime<Utc>>>;
    async fn save(&self, completed_at: DateTime<Utc>) -> Result<()>;
}

/// Checkpoint kept in the `monitor_checkpoints` table
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
    name: String,
}

impl SqliteCheckpointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self::named(pool, SWEEP_CHECKPOINT)
    }

    pub fn named(pool: SqlitePool, name: &str) -> Self {
        Self {
            pool,
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn load(&self) -> Result<Option<DateTime<Utc>>> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT completed_at FROM monitor_checkpoints WHERE name = ?",
        )
        .bind(&self.name)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load checkpoint '{}'", self.name))
    }

    async fn save(&self, completed_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO monitor_checkpoints (name, completed_at) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET completed_at = excluded.completed_at
            "#,
        )
        .bind(&self.name)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save checkpoint '{}'", self.name))?;
        Ok(())
    }
}

/// Checkpoint held in memory
#[derive(Default)]
pub struct MemoryCheckpointStore {
    value: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryCheckpointStore {
    pub fn new(initial: Option<DateTime<Utc>>) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<DateTime<Utc>>>> {
        self.value
            .lock()
            .map_err(|_| anyhow::anyhow!("checkpoint lock poisoned"))
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(*self.lock()?)
    }

    async fn save(&self, completed_at: DateTime<Utc>) -> Result<()> {
        *self.lock()? = Some(completed_at);
        Ok(())
    }
}
