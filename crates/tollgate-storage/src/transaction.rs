//! Transaction-aware ticket operations.
//!
//! Each terminal workflow is one unit of work: the ticket change is stored
//! only once the hardware output succeeded. Transactions stay short and start
//! with a write, so a concurrent writer waits on the busy timeout instead of
//! failing a read-to-write upgrade.
//!
//! # Usage Pattern
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use tollgate_core::DeviceId;
//! use tollgate_storage::models::NewTicket;
//! use tollgate_storage::{Database, DatabaseConfig, transaction};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("tollgate.db")).await?;
//! let device = DeviceId::new("gate1")?;
//!
//! let mut tx = db.pool().begin().await?;
//! let ticket = transaction::insert_ticket(
//!     &mut tx,
//!     &NewTicket::issue(&device, Duration::minutes(120), Utc::now()),
//! )
//! .await?;
//!
//! tx.commit().await?;
//! # let _ = ticket;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tollgate_core::DeviceId;

use crate::error::{StorageError, StorageResult};
use crate::models::{NewTicket, Ticket};
use crate::repositories::ticket::TICKET_COLUMNS;

/// Insert a freshly issued ticket and return the stored row.
pub async fn insert_ticket(
    tx: &mut Transaction<'_, Sqlite>,
    ticket: &NewTicket,
) -> StorageResult<Ticket> {
    let result = sqlx::query(
        r#"
        INSERT INTO tickets (code, created_at, created_by, valid_until)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&ticket.code)
    .bind(ticket.created_at)
    .bind(ticket.created_by.as_str())
    .bind(ticket.valid_until)
    .execute(&mut **tx)
    .await?;

    Ok(Ticket {
        id: result.last_insert_rowid(),
        code: ticket.code.clone(),
        created_at: ticket.created_at,
        created_by: ticket.created_by.to_string(),
        valid_until: ticket.valid_until,
        used_at: None,
        used_by: None,
        cancelled_at: None,
    })
}

/// Look up a ticket by its printed code.
pub async fn find_ticket_by_code(
    tx: &mut Transaction<'_, Sqlite>,
    code: &str,
) -> StorageResult<Option<Ticket>> {
    let ticket = sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE code = ?"
    ))
    .bind(code)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(ticket)
}

/// Record that `device` consumed the ticket at `at`.
///
/// Only an unused ticket is claimed; returns `false` when another device
/// used it first.
///
/// # Errors
///
/// `NotFound` if no ticket has this id.
pub async fn mark_ticket_used(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    device: &DeviceId,
    at: DateTime<Utc>,
) -> StorageResult<bool> {
    let result =
        sqlx::query("UPDATE tickets SET used_at = ?, used_by = ? WHERE id = ? AND used_at IS NULL")
            .bind(at)
            .bind(device.as_str())
            .bind(id)
            .execute(&mut **tx)
            .await?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tickets WHERE id = ?")
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
    if exists == 0 {
        return Err(StorageError::not_found("ticket", "id", id));
    }
    Ok(false)
}

/// Make the unit of work permanent.
pub async fn commit(tx: Transaction<'_, Sqlite>) -> StorageResult<()> {
    tx.commit().await?;
    Ok(())
}

/// Discard the unit of work.
pub async fn rollback(tx: Transaction<'_, Sqlite>) -> StorageResult<()> {
    tx.rollback().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::TicketStatus;
    use crate::repositories::{DeviceRepository, SqliteDeviceRepository};
    use chrono::Duration;
    use tollgate_core::Mode;

    async fn setup() -> (Database, DeviceId) {
        let db = Database::in_memory().await.unwrap();
        let device = DeviceId::new("gate1").unwrap();
        SqliteDeviceRepository::new(db.pool().clone())
            .touch(&device, Mode::Both, None)
            .await
            .unwrap();
        (db, device)
    }

    #[tokio::test]
    async fn test_insert_find_and_use() {
        let (db, device) = setup().await;
        let now = Utc::now();

        let mut tx = db.pool().begin().await.unwrap();
        let ticket = insert_ticket(&mut tx, &NewTicket::issue(&device, Duration::minutes(120), now))
            .await
            .unwrap();
        assert_eq!(ticket.created_by, "gate1");
        assert_eq!(ticket.status_at(now), TicketStatus::Valid);

        let found = find_ticket_by_code(&mut tx, &ticket.code).await.unwrap().unwrap();
        assert_eq!(found.id, ticket.id);

        assert!(mark_ticket_used(&mut tx, ticket.id, &device, now).await.unwrap());
        let used = find_ticket_by_code(&mut tx, &ticket.code).await.unwrap().unwrap();
        assert_eq!(used.used_by.as_deref(), Some("gate1"));
        assert_eq!(used.status_at(now), TicketStatus::Used);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_discards_ticket() {
        let (db, device) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        let ticket =
            insert_ticket(&mut tx, &NewTicket::issue(&device, Duration::minutes(5), Utc::now()))
                .await
                .unwrap();
        tx.rollback().await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert!(find_ticket_by_code(&mut tx, &ticket.code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_missing_ticket() {
        let (db, device) = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        let result = mark_ticket_used(&mut tx, 42, &device, Utc::now()).await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_ticket_claimed_once() {
        let (db, device) = setup().await;
        let now = Utc::now();

        let mut tx = db.begin().await.unwrap();
        let ticket = insert_ticket(&mut tx, &NewTicket::issue(&device, Duration::minutes(5), now))
            .await
            .unwrap();
        assert!(mark_ticket_used(&mut tx, ticket.id, &device, now).await.unwrap());

        let later = now + Duration::seconds(30);
        assert!(!mark_ticket_used(&mut tx, ticket.id, &device, later).await.unwrap());

        let stored = find_ticket_by_code(&mut tx, &ticket.code).await.unwrap().unwrap();
        assert!(stored.used_at.is_some_and(|at| at < later));
        commit(tx).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let (db, device) = setup().await;
        let new = NewTicket::issue(&device, Duration::minutes(5), Utc::now());

        let mut tx = db.pool().begin().await.unwrap();
        insert_ticket(&mut tx, &new).await.unwrap();
        assert!(matches!(
            insert_ticket(&mut tx, &new).await,
            Err(StorageError::Database(_))
        ));
    }
}
