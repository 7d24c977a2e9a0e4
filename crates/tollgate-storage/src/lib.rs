//! Storage layer for the tollgate ticket terminal.
//!
//! This crate provides SQLite-backed persistence for tickets, terminal
//! records, opening hours and runtime options. The schema lives in the
//! workspace `migrations/` directory and is applied on connect.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool manager with automatic migrations
//! - [`TicketRepository`], [`DeviceRepository`], [`HoursRepository`],
//!   [`OptionRepository`] - Data access traits
//! - [`transaction`] - Ticket operations that run inside a caller-owned
//!   transaction, so the hardware outcome decides commit or rollback
//!
//! # Options
//!
//! Options are keyed by name and optionally by device. A device-specific
//! value beats a wildcard (`device IS NULL`) value; among equals the newest
//! wins. Known options:
//!
//! | Name | Meaning |
//! |------|---------|
//! | `validity` | Minutes a printed ticket stays valid |
//! | `ticket_title` | Optional first line of the printed slip |
//!
//! # Example
//!
//! ```no_run
//! use tollgate_core::DeviceId;
//! use tollgate_storage::{Database, DatabaseConfig, OptionRepository, SqliteOptionRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("tollgate.db").max_connections(4)).await?;
//! let options = SqliteOptionRepository::new(db.pool().clone());
//!
//! let device = DeviceId::new("gate1")?;
//! let minutes = options.get_int("validity", &device).await?.unwrap_or(120);
//! println!("tickets are valid for {minutes} minutes");
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod transaction;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{
    DayPattern, DeviceRecord, ExceptionHours, Polarity, RegularHours, TemporalValidity, Ticket,
    TicketStatus,
};
pub use repositories::{
    DeviceRepository, HoursRepository, OptionRepository, SqliteDeviceRepository,
    SqliteHoursRepository, SqliteOptionRepository, SqliteTicketRepository, TicketRepository,
};

/// Option holding the ticket validity in minutes.
pub const OPTION_VALIDITY: &str = "validity";

/// Option holding the printed slip title.
pub const OPTION_TICKET_TITLE: &str = "ticket_title";
