//! Worker supervision.
//!
//! The supervisor spawns one task per worker and checks on them at a fixed
//! interval. A worker that stops while the terminal is running is treated as
//! a crash. Once the exit state leaves `Running` the supervisor waits for
//! every worker to finish its current unit of work, closes the ports and the
//! database, and reports the final state.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use tollgate_core::constants::SUPERVISOR_INTERVAL_MS;
use tollgate_hardware::Ports;
use tollgate_storage::Database;

use crate::device::Terminal;
use crate::error::WorkerError;
use crate::exit::{ExitSignal, ExitState};
use crate::workers::Worker;

pub struct Supervisor {
    workers: Vec<Worker>,
    ports: Ports,
    db: Database,
    exit: ExitSignal,
    interval: Duration,
}

impl Supervisor {
    /// Prepare the workers of `terminal`'s mode.
    pub fn new(terminal: Terminal, exit: ExitSignal) -> Result<Self, WorkerError> {
        let workers = Worker::for_mode(terminal.mode, &terminal.device, &terminal.db, &terminal.ports)?;
        Ok(Self {
            workers,
            ports: terminal.ports,
            db: terminal.db,
            exit,
            interval: Duration::from_millis(SUPERVISOR_INTERVAL_MS),
        })
    }

    /// Liveness check period.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until the exit state leaves `Running` and return the final state.
    pub async fn run(self) -> ExitState {
        let Self {
            workers,
            ports,
            db,
            exit,
            interval,
        } = self;

        let handles: Vec<(&'static str, JoinHandle<Result<(), WorkerError>>)> = workers
            .into_iter()
            .map(|worker| {
                debug!(worker = worker.name(), "Starting worker");
                (worker.name(), tokio::spawn(worker.run(exit.clone())))
            })
            .collect();

        let mut ticker = tokio::time::interval(interval);
        while exit.is_running() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = exit.stopped() => break,
            }

            for (name, handle) in &handles {
                if handle.is_finished() && exit.is_running() {
                    error!(worker = name, "Worker is not alive, exiting");
                    exit.crit_exit();
                }
            }
        }

        info!("Waiting for all workers to join");
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(())) => debug!(worker = name, "Worker joined"),
                Ok(Err(e)) => debug!(worker = name, error = %e, "Worker joined after failure"),
                Err(e) => {
                    error!(worker = name, error = %e, "Worker panicked");
                    exit.crit_exit();
                }
            }
        }

        ports.close_all().await;
        db.close().await;

        let state = exit.state();
        info!(state = %state, code = state.exit_code(), "Terminal stopped");
        state
    }
}
