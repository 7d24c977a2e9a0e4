//! Hardware port layer of the tollgate terminal.
//!
//! A terminal is built from up to four ports, one per [`Role`]: a button that
//! requests a ticket, a relay that opens the gate, a printer that issues the
//! ticket and a scanner that reads it back. Every driver implements the
//! [`Port`] contract; [`AnyPort`] dispatches over the concrete variants and
//! [`factory::PortFactory`] builds them from configuration values such as
//! `gpio:18` or `tcpgpio:10.0.0.7,7777,18`.
//!
//! # Design
//!
//! - **Async-first**: port I/O uses native `async fn` in traits
//!   (Edition 2024 RPITIT), dispatched through enums.
//! - **Bounded reads**: [`Port::read`] returns within about a second and
//!   observes a [`CancellationToken`](tokio_util::sync::CancellationToken),
//!   so worker loops stay responsive to shutdown.
//! - **Shared subsystems**: GPIO ports share one controller through a
//!   [`registry::HardwareRegistry`], initialized by the first open port and
//!   cleaned up by the last one.
//! - **Distinct write failures**: recoverable I/O failures during `write`
//!   are [`HardwareError::PortWrite`]; anything else is a bug or a
//!   misconfiguration.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tollgate_core::Role;
//! use tollgate_hardware::factory::{PortFactory, PortSettings};
//! use tollgate_hardware::gpio::{GpioChip, GpioRegistry, SimulatedGpio};
//!
//! #[tokio::main]
//! async fn main() {
//!     let gpio = Arc::new(GpioRegistry::new(GpioChip::new(SimulatedGpio::new())));
//!     let factory = PortFactory::new(gpio, PortSettings::default());
//!
//!     let ports = factory
//!         .create_all([
//!             (Role::Button, Some("gpio:16")),
//!             (Role::Relay, Some("gpio:12")),
//!             (Role::Printer, Some("log")),
//!             (Role::Scanner, None),
//!         ])
//!         .await;
//!
//!     assert_eq!(ports.available(), [Role::Button, Role::Relay, Role::Printer]);
//! }
//! ```
//!
//! [`Role`]: tollgate_core::Role

pub mod devices;
pub mod error;
pub mod factory;
pub mod gpio;
pub mod mock;
pub mod ports;
pub mod registry;
pub mod traits;
pub mod types;

pub use devices::{AnyPort, Ports};
pub use error::{HardwareError, Result};
pub use traits::Port;
pub use types::{Activation, PortData, PortEvent, RelayTiming, TicketSlip};
