//! Long-lived workflow tasks.
//!
//! A worker loops while the terminal is running: one bounded read on its
//! trigger port, then one unit of work for whatever the read produced. A unit
//! of work touches the hardware first and stores its ticket change in a short
//! transaction afterwards, so the print and scan workers never hold the
//! database write lock across a relay pulse.
//!
//! A port-write failure abandons the unit of work without storing anything
//! and the loop goes on.
//! Every other error ends the loop and escalates the terminal to a critical
//! exit.

mod print;
mod scan;

pub use print::PrintWorker;
pub use scan::ScanWorker;

use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tollgate_core::DeviceId;
use tollgate_hardware::{AnyPort, HardwareError, Port, PortEvent, Ports};
use tollgate_storage::{Database, Ticket, TicketStatus};

use crate::error::WorkerError;
use crate::exit::ExitSignal;
use crate::mode;

/// Result of one unit of work.
#[derive(Debug)]
pub enum Outcome {
    /// Outside opening hours; the event was discarded.
    Closed,
    /// A ticket was printed and the gate opened.
    Issued(Ticket),
    /// A ticket was consumed and the gate opened.
    Used(Ticket),
    /// The scanned code is unknown (`status` is `None`) or not valid.
    Rejected {
        code: String,
        status: Option<TicketStatus>,
    },
    /// A port write failed; nothing was stored.
    Aborted(HardwareError),
}

/// Drop events queued on `port` while the gate was engaged.
///
/// Runs after the unit of work is stored, so a failure is only logged.
pub(crate) async fn discard_queued(port: &AnyPort) {
    if let Err(e) = port.flush().await {
        warn!(port = %port.name(), error = %e, "Failed to discard queued events");
    }
}

/// A print or scan worker.
pub enum Worker {
    Print(PrintWorker),
    Scan(ScanWorker),
}

impl Worker {
    /// Build the workers `mode` needs from `ports`.
    ///
    /// # Errors
    ///
    /// Fails when a required port is missing.
    pub fn for_mode(
        mode: tollgate_core::Mode,
        device: &DeviceId,
        db: &Database,
        ports: &Ports,
    ) -> Result<Vec<Worker>, WorkerError> {
        let mut workers = Vec::new();
        if mode::prints(mode) {
            workers.push(Worker::Print(PrintWorker::new(device.clone(), db, ports)?));
        }
        if mode::scans(mode) {
            workers.push(Worker::Scan(ScanWorker::new(device.clone(), db, ports)?));
        }
        Ok(workers)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Worker::Print(_) => "print",
            Worker::Scan(_) => "scan",
        }
    }

    fn trigger(&self) -> &Arc<AnyPort> {
        match self {
            Worker::Print(worker) => worker.button(),
            Worker::Scan(worker) => worker.scanner(),
        }
    }

    /// Run one unit of work for `event`.
    pub async fn handle(&self, event: PortEvent) -> Result<Outcome, WorkerError> {
        match (self, event) {
            (Worker::Print(worker), PortEvent::Trigger) => worker.on_press().await,
            (Worker::Scan(worker), PortEvent::Code(code)) => worker.on_scan(&code).await,
            (_, event) => Err(WorkerError::UnexpectedEvent {
                port: self.trigger().name(),
                event: format!("{event:?}"),
            }),
        }
    }

    /// Loop until the terminal stops running.
    ///
    /// An error escalates `exit` to a critical exit before it is returned.
    pub async fn run(self, exit: ExitSignal) -> Result<(), WorkerError> {
        info!(worker = self.name(), "Worker started");

        let result = self.run_loop(&exit).await;
        match &result {
            Ok(()) => debug!(worker = self.name(), "Worker is exiting"),
            Err(e) => {
                error!(worker = self.name(), error = %e, "Worker has failed");
                exit.crit_exit();
            }
        }
        result
    }

    async fn run_loop(&self, exit: &ExitSignal) -> Result<(), WorkerError> {
        let trigger = Arc::clone(self.trigger());
        while exit.is_running() {
            let Some(event) = trigger.read(exit.token()).await? else {
                continue;
            };
            let outcome = self.handle(event).await?;
            debug!(worker = self.name(), ?outcome, "Unit of work finished");
        }
        Ok(())
    }
}
