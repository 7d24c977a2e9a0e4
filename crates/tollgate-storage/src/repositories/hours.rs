#![allow(async_fn_in_trait)]

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tollgate_core::DeviceId;

use crate::error::StorageResult;
use crate::models::{ExceptionHours, ExceptionHoursRow, RegularHours, RegularHoursRow};

/// Repository trait for opening-hours rules.
///
/// Both queries return the rules of `device` together with wildcard rules,
/// ordered by creation (oldest first).
pub trait HoursRepository: Send + Sync {
    async fn regular_rules(&self, device: &DeviceId) -> StorageResult<Vec<RegularHours>>;

    async fn exceptions_on(
        &self,
        device: &DeviceId,
        date: NaiveDate,
    ) -> StorageResult<Vec<ExceptionHours>>;

    /// Append a regular rule; its `id` is ignored. Returns the new id.
    async fn add_regular(&self, rule: &RegularHours) -> StorageResult<i64>;

    /// Append an exception; its `id` is ignored. Returns the new id.
    async fn add_exception(&self, rule: &ExceptionHours) -> StorageResult<i64>;
}

/// SQLite implementation of HoursRepository
pub struct SqliteHoursRepository {
    pool: SqlitePool,
}

impl SqliteHoursRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl HoursRepository for SqliteHoursRepository {
    async fn regular_rules(&self, device: &DeviceId) -> StorageResult<Vec<RegularHours>> {
        let rows = sqlx::query_as::<_, RegularHoursRow>(
            r#"
            SELECT id, device, day_of_week, time_start, time_end
            FROM regular_hours
            WHERE device = ? OR device IS NULL
            ORDER BY id
            "#,
        )
        .bind(device.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RegularHours::try_from).collect()
    }

    async fn exceptions_on(
        &self,
        device: &DeviceId,
        date: NaiveDate,
    ) -> StorageResult<Vec<ExceptionHours>> {
        let rows = sqlx::query_as::<_, ExceptionHoursRow>(
            r#"
            SELECT id, device, exception_date, exception_type, time_start, time_end
            FROM exception_hours
            WHERE (device = ? OR device IS NULL) AND exception_date = ?
            ORDER BY id
            "#,
        )
        .bind(device.as_str())
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ExceptionHours::try_from).collect()
    }

    async fn add_regular(&self, rule: &RegularHours) -> StorageResult<i64> {
        let row = RegularHoursRow::from(rule);
        let result = sqlx::query(
            r#"
            INSERT INTO regular_hours (device, day_of_week, time_start, time_end)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&row.device)
        .bind(row.day_of_week)
        .bind(&row.time_start)
        .bind(&row.time_end)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn add_exception(&self, rule: &ExceptionHours) -> StorageResult<i64> {
        let row = ExceptionHoursRow::from(rule);
        let result = sqlx::query(
            r#"
            INSERT INTO exception_hours
                (device, exception_date, exception_type, time_start, time_end)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.device)
        .bind(&row.exception_date)
        .bind(&row.exception_type)
        .bind(&row.time_start)
        .bind(&row.time_end)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}
