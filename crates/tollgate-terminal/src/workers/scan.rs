use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use tollgate_core::{DeviceId, Role};
use tollgate_hardware::{Activation, AnyPort, Port, PortData, Ports};
use tollgate_storage::{
    Database, SqliteHoursRepository, SqliteTicketRepository, Ticket, TicketRepository,
    TicketStatus, transaction,
};

use super::{Outcome, discard_queued};
use crate::error::WorkerError;
use crate::hours::OpeningHours;

/// Validates scanned tickets and opens the gate for valid ones.
pub struct ScanWorker {
    device: DeviceId,
    db: Database,
    hours: OpeningHours<SqliteHoursRepository>,
    tickets: SqliteTicketRepository,
    relay: Arc<AnyPort>,
    scanner: Arc<AnyPort>,
}

impl ScanWorker {
    pub fn new(device: DeviceId, db: &Database, ports: &Ports) -> Result<Self, WorkerError> {
        Ok(Self {
            hours: OpeningHours::new(SqliteHoursRepository::new(db.pool().clone()), device.clone()),
            tickets: SqliteTicketRepository::new(db.pool().clone()),
            db: db.clone(),
            relay: ports.require(Role::Relay)?,
            scanner: ports.require(Role::Scanner)?,
            device,
        })
    }

    pub(super) fn scanner(&self) -> &Arc<AnyPort> {
        &self.scanner
    }

    /// Validate and consume one scanned code.
    pub async fn on_scan(&self, data: &str) -> Result<Outcome, WorkerError> {
        // CODE39 readers may pass the start/stop characters through
        let code = data.trim().trim_matches('*').to_string();
        info!(device_id = %self.device, code = %code, "Code scanned");

        if !self.hours.check().await? {
            warn!("Event past opening hours, ignoring");
            return Ok(Outcome::Closed);
        }

        let now = Utc::now();
        let Some(ticket) = self.tickets.find_by_code(&code).await? else {
            info!(code = %code, "Unknown ticket, ignoring");
            return Ok(Outcome::Rejected { code, status: None });
        };

        let status = ticket.status_at(now);
        if !status.is_valid() {
            info!(code = %code, %status, "Invalid ticket, ignoring");
            return Ok(Outcome::Rejected {
                code,
                status: Some(status),
            });
        }

        match self.relay.write(&PortData::Activate(Activation::Scan)).await {
            Ok(()) => {}
            Err(e) if e.is_port_write() => {
                error!(code = %code, error = %e, "Cannot write port, ticket left unused");
                return Ok(Outcome::Aborted(e));
            }
            Err(e) => return Err(e.into()),
        }

        let mut tx = self.db.begin().await?;
        let claimed = transaction::mark_ticket_used(&mut tx, ticket.id, &self.device, now).await?;
        transaction::commit(tx).await?;

        if !claimed {
            warn!(code = %code, "Ticket was used elsewhere while the gate opened");
            return Ok(Outcome::Rejected {
                code,
                status: Some(TicketStatus::Used),
            });
        }
        info!(code = %code, "Ticket used");

        // Keeps other tickets from being used before the gate closes
        discard_queued(&self.scanner).await;

        Ok(Outcome::Used(Ticket {
            used_at: Some(now),
            used_by: Some(self.device.to_string()),
            ..ticket
        }))
    }
}
