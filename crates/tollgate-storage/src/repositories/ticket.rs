#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{StorageError, StorageResult};
use crate::models::Ticket;

/// Repository trait for ticket lookups outside a worker's unit of work.
pub trait TicketRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> StorageResult<Option<Ticket>>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Ticket>>;

    /// Cancel a ticket so it can no longer be used.
    async fn cancel(&self, code: &str, at: DateTime<Utc>) -> StorageResult<()>;
}

/// SQLite implementation of TicketRepository
pub struct SqliteTicketRepository {
    pool: SqlitePool,
}

impl SqliteTicketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) const TICKET_COLUMNS: &str =
    "id, code, created_at, created_by, valid_until, used_at, used_by, cancelled_at";

impl TicketRepository for SqliteTicketRepository {
    async fn find_by_code(&self, code: &str) -> StorageResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE code = ?"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn cancel(&self, code: &str, at: DateTime<Utc>) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE tickets SET cancelled_at = ? WHERE code = ? AND cancelled_at IS NULL",
        )
        .bind(at)
        .bind(code)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.find_by_code(code).await?.is_none() {
            return Err(StorageError::not_found("ticket", "code", code));
        }
        Ok(())
    }
}
