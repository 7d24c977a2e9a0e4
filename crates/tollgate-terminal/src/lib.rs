//! Ticket terminal runtime.
//!
//! Ties the hardware ports and the ticket store together:
//!
//! - [`mode`] decides what the terminal does with the ports it has
//! - [`hours`] decides whether it may act right now
//! - [`workers`] run the print and scan workflows
//! - [`supervisor`] starts the workers, watches them and shuts down
//! - [`exit`] is the shared exit state every loop checks
//!
//! # Example
//!
//! ```no_run
//! use tollgate_core::DeviceId;
//! use tollgate_hardware::Ports;
//! use tollgate_storage::Database;
//! use tollgate_terminal::{ExitSignal, RequestedMode, Supervisor, bootstrap};
//!
//! # async fn example(ports: Ports) -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::in_memory().await?;
//! let device = DeviceId::new("gate1")?;
//!
//! let terminal = bootstrap(Some(device), RequestedMode::Auto, ports, db).await?;
//! let exit = ExitSignal::new();
//! let state = Supervisor::new(terminal, exit)?.run().await;
//! std::process::exit(state.exit_code().into());
//! # }
//! ```

pub mod device;
pub mod error;
pub mod exit;
pub mod hours;
pub mod mode;
pub mod supervisor;
pub mod workers;

pub use device::{Terminal, bootstrap};
pub use error::{ResolveError, WorkerError};
pub use exit::{ExitSignal, ExitState};
pub use hours::OpeningHours;
pub use mode::RequestedMode;
pub use supervisor::Supervisor;
pub use workers::{Outcome, PrintWorker, ScanWorker, Worker};
