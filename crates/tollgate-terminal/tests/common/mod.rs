//! Shared setup for terminal integration tests.

#![allow(dead_code)]

use chrono::{Duration, Local, Utc};
use std::path::Path;
use std::time::Duration as StdDuration;
use tollgate_core::{DeviceId, Mode};
use tollgate_hardware::Ports;
use tollgate_hardware::mock::{
    MockButton, MockButtonHandle, MockPrinter, MockPrinterHandle, MockRelay, MockRelayHandle,
    MockScanner, MockScannerHandle,
};
use tollgate_storage::models::{NewTicket, parse_time};
use tollgate_storage::{
    Database, DatabaseConfig, DayPattern, DeviceRepository, ExceptionHours, HoursRepository, Polarity,
    RegularHours, SqliteDeviceRepository, SqliteHoursRepository, Ticket, transaction,
};

/// Terminal with mock ports, open around the clock.
pub struct Rig {
    pub db: Database,
    pub device: DeviceId,
    pub ports: Ports,
    pub button: MockButtonHandle,
    pub relay: MockRelayHandle,
    pub printer: MockPrinterHandle,
    pub scanner: MockScannerHandle,
}

impl Rig {
    pub async fn new() -> Self {
        Self::with_database(Database::in_memory().await.unwrap(), StdDuration::ZERO).await
    }

    /// Terminal backed by a database file, with a relay that stays engaged
    /// for `relay_period` on every activation.
    pub async fn on_file(path: &Path, relay_period: StdDuration) -> Self {
        let db = Database::new(DatabaseConfig::new(path.display().to_string()))
            .await
            .unwrap();
        Self::with_database(db, relay_period).await
    }

    async fn with_database(db: Database, relay_period: StdDuration) -> Self {
        let device = DeviceId::new("gate1").unwrap();
        SqliteDeviceRepository::new(db.pool().clone())
            .touch(&device, Mode::Both, None)
            .await
            .unwrap();

        SqliteHoursRepository::new(db.pool().clone())
            .add_regular(&RegularHours {
                id: 0,
                device: None,
                days: DayPattern::Everyday,
                start: parse_time("00:00").unwrap(),
                end: parse_time("24:00").unwrap(),
            })
            .await
            .unwrap();

        let (button, button_handle) = MockButton::new();
        let (relay, relay_handle) = MockRelay::new();
        let relay = relay.with_period(relay_period);
        let (printer, printer_handle) = MockPrinter::new();
        let (scanner, scanner_handle) = MockScanner::new();
        let ports = Ports::new()
            .with(button)
            .with(relay)
            .with(printer)
            .with(scanner);

        Self {
            db,
            device,
            ports,
            button: button_handle,
            relay: relay_handle,
            printer: printer_handle,
            scanner: scanner_handle,
        }
    }

    /// Open every port.
    pub async fn open_ports(&self) {
        self.ports.open_roles(&self.ports.available()).await.unwrap();
    }

    /// Close the terminal for the rest of today.
    pub async fn close_today(&self) {
        SqliteHoursRepository::new(self.db.pool().clone())
            .add_exception(&ExceptionHours {
                id: 0,
                device: Some(self.device.to_string()),
                date: Local::now().date_naive(),
                polarity: Polarity::Closed,
                start: parse_time("00:00").unwrap(),
                end: parse_time("24:00").unwrap(),
            })
            .await
            .unwrap();
    }

    /// Store a ticket issued `age` ago with the given validity.
    pub async fn issue(&self, age: Duration, validity: Duration) -> Ticket {
        let mut tx = self.db.begin().await.unwrap();
        let ticket = transaction::insert_ticket(
            &mut tx,
            &NewTicket::issue(&self.device, validity, Utc::now() - age),
        )
        .await
        .unwrap();
        transaction::commit(tx).await.unwrap();
        ticket
    }

    pub async fn ticket_count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tickets")
            .fetch_one(self.db.pool())
            .await
            .unwrap()
    }
}
