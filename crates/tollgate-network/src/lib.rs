//! Network layer for TCPGPIO.
//!
//! This crate provides both ends of the TCPGPIO protocol:
//!
//! - **TcpGpioClient**: one request/reply exchange with a remote lock service,
//!   used by the remote relay port
//! - **LockService**: the server side, which drives local pins on behalf of
//!   remote terminals and arbitrates exclusive writes through a
//!   [`PinLockTable`]
//!
//! # Example
//!
//! ```no_run
//! use tollgate_core::{Pin, PinValue};
//! use tollgate_network::{TcpGpioClient, TcpGpioClientConfig};
//! use tollgate_protocol::Message;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TcpGpioClientConfig {
//!     server_addr: "192.168.0.20:7777".parse()?,
//!     timeout: Duration::from_secs(5),
//! };
//!
//! let msg = Message::exclusive_write("gate1", Pin::new(18)?, PinValue::High)?;
//! let reply = TcpGpioClient::new(config).exchange(msg).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod lock;
mod server;

pub use client::{TcpGpioClient, TcpGpioClientConfig, TcpGpioClientError};
pub use lock::{LockOutcome, PinLock, PinLockTable};
pub use server::{ConnectionId, LockService, LockServiceConfig, LockServiceError, PinWriter};
