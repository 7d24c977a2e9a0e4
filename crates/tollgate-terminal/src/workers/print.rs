use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use tollgate_core::constants::DEFAULT_TICKET_VALIDITY_MIN;
use tollgate_core::{DeviceId, Role};
use tollgate_hardware::{Activation, AnyPort, Port, PortData, Ports, TicketSlip};
use tollgate_storage::models::NewTicket;
use tollgate_storage::{
    Database, OPTION_TICKET_TITLE, OPTION_VALIDITY, OptionRepository, SqliteHoursRepository,
    SqliteOptionRepository, transaction,
};

use super::{Outcome, discard_queued};
use crate::error::WorkerError;
use crate::hours::OpeningHours;

/// Issues a ticket for every button press.
pub struct PrintWorker {
    device: DeviceId,
    db: Database,
    hours: OpeningHours<SqliteHoursRepository>,
    options: SqliteOptionRepository,
    button: Arc<AnyPort>,
    relay: Arc<AnyPort>,
    printer: Arc<AnyPort>,
}

impl PrintWorker {
    pub fn new(device: DeviceId, db: &Database, ports: &Ports) -> Result<Self, WorkerError> {
        Ok(Self {
            hours: OpeningHours::new(SqliteHoursRepository::new(db.pool().clone()), device.clone()),
            options: SqliteOptionRepository::new(db.pool().clone()),
            db: db.clone(),
            button: ports.require(Role::Button)?,
            relay: ports.require(Role::Relay)?,
            printer: ports.require(Role::Printer)?,
            device,
        })
    }

    pub(super) fn button(&self) -> &Arc<AnyPort> {
        &self.button
    }

    async fn validity(&self) -> Result<Duration, WorkerError> {
        let minutes = match self.options.get_int(OPTION_VALIDITY, &self.device).await? {
            Some(minutes) if minutes > 0 => minutes,
            Some(minutes) => {
                warn!(minutes, "Ticket validity must be positive, using default");
                DEFAULT_TICKET_VALIDITY_MIN
            }
            None => DEFAULT_TICKET_VALIDITY_MIN,
        };
        Ok(Duration::minutes(minutes))
    }

    /// Issue, print and release one ticket.
    pub async fn on_press(&self) -> Result<Outcome, WorkerError> {
        info!(device_id = %self.device, "Button pressed");

        if !self.hours.check().await? {
            warn!("Event past opening hours, ignoring");
            return Ok(Outcome::Closed);
        }

        let validity = self.validity().await?;
        let title = self.options.get(OPTION_TICKET_TITLE, &self.device).await?;

        let issued = NewTicket::issue(&self.device, validity, Utc::now());
        let slip = TicketSlip {
            code: issued.code.clone(),
            issued_at: issued.created_at,
            valid_until: issued.valid_until,
            title,
        };

        let written = async {
            self.printer.write(&PortData::Ticket(slip)).await?;
            self.relay.write(&PortData::Activate(Activation::Print)).await
        }
        .await;

        match written {
            Ok(()) => {}
            Err(e) if e.is_port_write() => {
                error!(code = %issued.code, error = %e, "Cannot write port, ticket discarded");
                return Ok(Outcome::Aborted(e));
            }
            Err(e) => return Err(e.into()),
        }

        // Stored only once the hardware is done, so no lock is held across I/O
        let mut tx = self.db.begin().await?;
        let ticket = transaction::insert_ticket(&mut tx, &issued).await?;
        transaction::commit(tx).await?;
        info!(code = %ticket.code, valid_until = %ticket.valid_until, "Ticket issued");

        // Presses queued while the relay was engaged are stale
        discard_queued(&self.button).await;
        Ok(Outcome::Issued(ticket))
    }
}
