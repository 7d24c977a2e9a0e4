//! Error types for terminal startup and the worker loops.

use thiserror::Error;
use tollgate_core::{Mode, Role};
use tollgate_hardware::HardwareError;
use tollgate_storage::StorageError;

/// Why the terminal could not settle on a device identity and mode.
///
/// Always fatal: the process exits before any worker starts.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Device id is not configured")]
    MissingDeviceId,

    #[error("Mode {mode} requires unavailable ports: {}", join(.missing))]
    MissingPorts { mode: Mode, missing: Vec<Role> },

    #[error("No mode can run with the available ports: [{}]", join(.available))]
    NoSatisfiableMode { available: Vec<Role> },

    #[error("Failed to open ports: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Failed to record device: {0}")]
    Storage(#[from] StorageError),
}

fn join(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Unmodeled failure inside a worker loop.
///
/// Port-write failures are handled inside the workflow and never surface
/// here; anything that does escalates the terminal to a critical exit.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Unexpected {event} event on {port}")]
    UnexpectedEvent { port: String, event: String },
}
