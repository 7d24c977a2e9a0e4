#![allow(async_fn_in_trait)]

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use tollgate_core::{DeviceId, Mode};

use crate::error::StorageResult;
use crate::models::DeviceRecord;

/// Repository trait for terminal records.
pub trait DeviceRepository: Send + Sync {
    async fn find(&self, id: &DeviceId) -> StorageResult<Option<DeviceRecord>>;

    /// Record that the device started in `mode` from `ip`, creating the
    /// record if needed.
    async fn touch(&self, id: &DeviceId, mode: Mode, ip: Option<&str>) -> StorageResult<()>;
}

/// SQLite implementation of DeviceRepository
pub struct SqliteDeviceRepository {
    pool: SqlitePool,
}

impl SqliteDeviceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DeviceRepository for SqliteDeviceRepository {
    async fn find(&self, id: &DeviceId) -> StorageResult<Option<DeviceRecord>> {
        let device = sqlx::query_as::<_, DeviceRecord>(
            "SELECT id, last_seen, last_mode, last_ip FROM devices WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(device)
    }

    async fn touch(&self, id: &DeviceId, mode: Mode, ip: Option<&str>) -> StorageResult<()> {
        if self.find(id).await?.is_none() {
            warn!(device_id = %id, "Device record not found, creating it");
        }

        sqlx::query(
            r#"
            INSERT INTO devices (id, last_seen, last_mode, last_ip)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                last_seen = excluded.last_seen,
                last_mode = excluded.last_mode,
                last_ip = excluded.last_ip
            "#,
        )
        .bind(id.as_str())
        .bind(Utc::now())
        .bind(mode.as_str())
        .bind(ip)
        .execute(&self.pool)
        .await?;

        debug!(device_id = %id, %mode, ip, "Device record updated");
        Ok(())
    }
}
