//! The port contract.
//!
//! Every driver variant (button, relay, printer, scanner) implements [`Port`].
//! The trait supplies fail-raising defaults for the operations a role does not
//! support, so a relay only implements `write` and a scanner only `read` and
//! `flush`.
//!
//! All methods take `&self`: a port is shared between tasks through an `Arc`
//! and keeps whatever mutable state it needs behind its own interior
//! mutability. Nothing serializes two writes to the same port.
//!
//! # Contract
//!
//! - Constructors validate and store arguments only; they never touch hardware
//! - [`test`](Port::test) checks that the hardware or file is usable
//! - [`read`](Port::read) returns within a bounded interval (about one second)
//!   and returns `Ok(None)` as soon as the cancellation token fires
//! - [`write`](Port::write) reports I/O failures as
//!   [`HardwareError::PortWrite`](crate::HardwareError::PortWrite)
//! - [`flush`](Port::flush) discards queued events and has no other effect
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! so they are not object-safe. Dynamic dispatch goes through the
//! [`AnyPort`](crate::devices::AnyPort) enum.

#![allow(async_fn_in_trait)]

use tokio_util::sync::CancellationToken;
use tollgate_core::Role;

use crate::error::{HardwareError, Result};
use crate::types::{PortData, PortEvent};

/// Capability interface of every port variant.
///
/// # Examples
///
/// ```no_run
/// use tokio_util::sync::CancellationToken;
/// use tollgate_hardware::{Port, PortEvent, Result};
///
/// async fn wait_for_press<P: Port>(button: &P, cancel: &CancellationToken) -> Result<bool> {
///     while !cancel.is_cancelled() {
///         if let Some(PortEvent::Trigger) = button.read(cancel).await? {
///             return Ok(true);
///         }
///     }
///     Ok(false)
/// }
/// ```
pub trait Port: Send + Sync {
    /// Role this port was built for.
    fn role(&self) -> Role;

    /// Configuration name of the variant (`gpio`, `tcpgpio`, ...).
    fn variant(&self) -> &'static str;

    /// Human readable name used in logs and errors.
    fn name(&self) -> String {
        format!("{} {}", self.role(), self.variant())
    }

    /// Acquire the underlying device.
    async fn open(&self) -> Result<()>;

    /// Release the underlying device. Closing a closed port is a no-op.
    async fn close(&self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Check that the port can work.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::PortTest`] describing what is unusable.
    async fn test(&self) -> Result<()> {
        Ok(())
    }

    /// Wait a bounded time for one event.
    ///
    /// Returns `Ok(None)` on timeout or cancellation.
    async fn read(&self, cancel: &CancellationToken) -> Result<Option<PortEvent>> {
        let _ = cancel;
        Err(HardwareError::unsupported(format!("{} read", self.name())))
    }

    /// Perform the role specific action.
    async fn write(&self, data: &PortData) -> Result<()> {
        let _ = data;
        Err(HardwareError::unsupported(format!("{} write", self.name())))
    }

    /// Discard queued events.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
