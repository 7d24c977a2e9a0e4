use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tollgate_core::DeviceId;

use super::TemporalValidity;

/// Length of a ticket code in hexadecimal characters.
pub const TICKET_CODE_LENGTH: usize = 12;

/// Fresh ticket code: 12 uppercase hexadecimal characters.
///
/// The alphabet is a subset of CODE39, so codes print as barcodes verbatim.
///
/// ```
/// let code = tollgate_storage::models::generate_code();
/// assert_eq!(code.len(), 12);
/// assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
/// ```
pub fn generate_code() -> String {
    let mut code = uuid::Uuid::new_v4().simple().to_string();
    code.truncate(TICKET_CODE_LENGTH);
    code.make_ascii_uppercase();
    code
}

/// Issued ticket.
///
/// # Database Schema
///
/// Maps to the `tickets` table; `code` is unique, `created_by` and `used_by`
/// reference `devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: i64,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub valid_until: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Outcome of validating a ticket at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Valid,
    Used,
    Cancelled,
    Expired,
    NotYetValid,
}

impl TicketStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, TicketStatus::Valid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Used => "already used",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Expired => "expired",
            TicketStatus::NotYetValid => "not yet valid",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Ticket {
    /// Validate the ticket for entry at `now`.
    ///
    /// Checks run in order: used, cancelled, not yet valid, expired.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use tollgate_storage::models::{Ticket, TicketStatus};
    ///
    /// let now = Utc::now();
    /// let ticket = Ticket {
    ///     id: 1,
    ///     code: "0A1B2C3D4E5F".into(),
    ///     created_at: now,
    ///     created_by: "gate1".into(),
    ///     valid_until: now + Duration::minutes(120),
    ///     used_at: None,
    ///     used_by: None,
    ///     cancelled_at: None,
    /// };
    ///
    /// assert_eq!(ticket.status_at(now + Duration::minutes(30)), TicketStatus::Valid);
    /// assert_eq!(ticket.status_at(now + Duration::minutes(121)), TicketStatus::Expired);
    /// ```
    pub fn status_at(&self, now: DateTime<Utc>) -> TicketStatus {
        if self.used_at.is_some() {
            return TicketStatus::Used;
        }
        if self.cancelled_at.is_some() {
            return TicketStatus::Cancelled;
        }
        if now < self.created_at {
            return TicketStatus::NotYetValid;
        }
        if !self.is_valid_at(now) {
            return TicketStatus::Expired;
        }
        TicketStatus::Valid
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

impl TemporalValidity for Ticket {
    fn is_active(&self) -> bool {
        self.cancelled_at.is_none()
    }

    fn validity_start(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn validity_end(&self) -> Option<DateTime<Utc>> {
        Some(self.valid_until)
    }
}

/// Ticket about to be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub created_by: DeviceId,
    pub valid_until: DateTime<Utc>,
}

impl NewTicket {
    /// Issue a ticket with a fresh code, valid for `validity` from `now`.
    pub fn issue(device: &DeviceId, validity: Duration, now: DateTime<Utc>) -> Self {
        Self {
            code: generate_code(),
            created_at: now,
            created_by: device.clone(),
            valid_until: now + validity,
        }
    }
}
