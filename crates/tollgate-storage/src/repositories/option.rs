#![allow(async_fn_in_trait)]

use sqlx::SqlitePool;
use tollgate_core::DeviceId;

use crate::error::{StorageError, StorageResult};

/// Repository trait for runtime options.
pub trait OptionRepository: Send + Sync {
    /// Value of `option` for `device`.
    ///
    /// A device-specific record wins over a wildcard one; among equals the
    /// newest wins. A stored NULL reads as `None`.
    async fn get(&self, option: &str, device: &DeviceId) -> StorageResult<Option<String>>;

    /// Like [`get`](Self::get), parsed as an integer.
    async fn get_int(&self, option: &str, device: &DeviceId) -> StorageResult<Option<i64>> {
        self.get(option, device)
            .await?
            .map(|raw| {
                raw.trim().parse::<i64>().map_err(|e| {
                    StorageError::Validation(format!("option {option}={raw:?}: {e}"))
                })
            })
            .transpose()
    }

    /// Store an option. `None` device sets a wildcard value.
    async fn set(
        &self,
        option: &str,
        value: Option<&str>,
        device: Option<&DeviceId>,
    ) -> StorageResult<()>;
}

/// SQLite implementation of OptionRepository
pub struct SqliteOptionRepository {
    pool: SqlitePool,
}

impl SqliteOptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl OptionRepository for SqliteOptionRepository {
    async fn get(&self, option: &str, device: &DeviceId) -> StorageResult<Option<String>> {
        let value = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT value FROM options
            WHERE option = ? AND (device = ? OR device IS NULL)
            ORDER BY device IS NULL, id DESC
            LIMIT 1
            "#,
        )
        .bind(option)
        .bind(device.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.flatten())
    }

    async fn set(
        &self,
        option: &str,
        value: Option<&str>,
        device: Option<&DeviceId>,
    ) -> StorageResult<()> {
        // NULL devices never conflict, so wildcard values append and the newest wins
        sqlx::query(
            r#"
            INSERT INTO options (option, value, device)
            VALUES (?, ?, ?)
            ON CONFLICT (option, device) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(option)
        .bind(value)
        .bind(device.map(DeviceId::as_str))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::repositories::{DeviceRepository, SqliteDeviceRepository};
    use tollgate_core::Mode;

    async fn setup() -> (Database, SqliteOptionRepository, DeviceId) {
        let db = Database::in_memory().await.unwrap();
        let gate1 = DeviceId::new("gate1").unwrap();
        SqliteDeviceRepository::new(db.pool().clone())
            .touch(&gate1, Mode::Print, None)
            .await
            .unwrap();
        let repo = SqliteOptionRepository::new(db.pool().clone());
        (db, repo, gate1)
    }

    #[tokio::test]
    async fn test_device_value_wins_over_wildcard() {
        let (_db, repo, gate1) = setup().await;
        let gate2 = DeviceId::new("gate2").unwrap();

        repo.set("validity", Some("60"), Some(&gate1)).await.unwrap();
        repo.set("validity", Some("90"), None).await.unwrap();

        assert_eq!(repo.get_int("validity", &gate1).await.unwrap(), Some(60));
        assert_eq!(repo.get_int("validity", &gate2).await.unwrap(), Some(90));
    }

    #[tokio::test]
    async fn test_newest_wildcard_wins() {
        let (_db, repo, gate1) = setup().await;

        repo.set("ticket_title", Some("Parking"), None).await.unwrap();
        repo.set("ticket_title", Some("Car park"), None).await.unwrap();
        assert_eq!(
            repo.get("ticket_title", &gate1).await.unwrap().as_deref(),
            Some("Car park")
        );
    }

    #[tokio::test]
    async fn test_device_value_is_replaced() {
        let (_db, repo, gate1) = setup().await;

        repo.set("validity", Some("60"), Some(&gate1)).await.unwrap();
        repo.set("validity", Some("45"), Some(&gate1)).await.unwrap();
        assert_eq!(repo.get_int("validity", &gate1).await.unwrap(), Some(45));
    }

    #[tokio::test]
    async fn test_missing_null_and_invalid() {
        let (_db, repo, gate1) = setup().await;

        assert_eq!(repo.get("validity", &gate1).await.unwrap(), None);

        repo.set("validity", None, Some(&gate1)).await.unwrap();
        assert_eq!(repo.get_int("validity", &gate1).await.unwrap(), None);

        repo.set("validity", Some("two hours"), Some(&gate1)).await.unwrap();
        assert!(matches!(
            repo.get_int("validity", &gate1).await,
            Err(StorageError::Validation(_))
        ));
    }
}
