//! Enum dispatch over every port variant.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn Port>` is not
//! an option. [`AnyPort`] wraps each concrete variant instead and forwards
//! the [`Port`] methods with a `match`. The factory's table of named
//! constructors produces `AnyPort` values.
//!
//! # Examples
//!
//! ```
//! use tollgate_core::Role;
//! use tollgate_hardware::devices::{AnyPort, Ports};
//! use tollgate_hardware::mock::MockRelay;
//! use tollgate_hardware::Port;
//!
//! let (relay, _handle) = MockRelay::new();
//! let port = AnyPort::from(relay);
//! assert_eq!(port.role(), Role::Relay);
//!
//! let ports = Ports::new().with(port);
//! assert!(ports.has(Role::Relay));
//! assert!(!ports.has(Role::Printer));
//! ```

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use tollgate_core::Role;

use crate::error::{HardwareError, Result};
use crate::mock::{MockButton, MockPrinter, MockRelay, MockScanner};
use crate::ports::{
    FifoScanner, FilePrinter, GpioButton, GpioRelay, LogPrinter, LogRelay, SerialPrinter,
    SocketScanner, TcpGpioRelay,
};
use crate::traits::Port;
use crate::types::{PortData, PortEvent};

/// Any port variant.
#[derive(Debug)]
pub enum AnyPort {
    GpioButton(GpioButton),
    LogRelay(LogRelay),
    GpioRelay(GpioRelay),
    TcpGpioRelay(TcpGpioRelay),
    LogPrinter(LogPrinter),
    FilePrinter(FilePrinter),
    SerialPrinter(SerialPrinter),
    SocketScanner(SocketScanner),
    FifoScanner(FifoScanner),
    MockButton(MockButton),
    MockRelay(MockRelay),
    MockPrinter(MockPrinter),
    MockScanner(MockScanner),
}

macro_rules! dispatch {
    ($self:ident, $port:ident => $body:expr) => {
        match $self {
            AnyPort::GpioButton($port) => $body,
            AnyPort::LogRelay($port) => $body,
            AnyPort::GpioRelay($port) => $body,
            AnyPort::TcpGpioRelay($port) => $body,
            AnyPort::LogPrinter($port) => $body,
            AnyPort::FilePrinter($port) => $body,
            AnyPort::SerialPrinter($port) => $body,
            AnyPort::SocketScanner($port) => $body,
            AnyPort::FifoScanner($port) => $body,
            AnyPort::MockButton($port) => $body,
            AnyPort::MockRelay($port) => $body,
            AnyPort::MockPrinter($port) => $body,
            AnyPort::MockScanner($port) => $body,
        }
    };
}

macro_rules! impl_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for AnyPort {
                fn from(port: $variant) -> Self {
                    AnyPort::$variant(port)
                }
            }
        )*
    };
}

impl_from!(
    GpioButton,
    LogRelay,
    GpioRelay,
    TcpGpioRelay,
    LogPrinter,
    FilePrinter,
    SerialPrinter,
    SocketScanner,
    FifoScanner,
    MockButton,
    MockRelay,
    MockPrinter,
    MockScanner,
);

impl Port for AnyPort {
    fn role(&self) -> Role {
        dispatch!(self, port => port.role())
    }

    fn variant(&self) -> &'static str {
        dispatch!(self, port => port.variant())
    }

    fn name(&self) -> String {
        dispatch!(self, port => port.name())
    }

    async fn open(&self) -> Result<()> {
        dispatch!(self, port => port.open().await)
    }

    async fn close(&self) -> Result<()> {
        dispatch!(self, port => port.close().await)
    }

    fn is_open(&self) -> bool {
        dispatch!(self, port => port.is_open())
    }

    async fn test(&self) -> Result<()> {
        dispatch!(self, port => port.test().await)
    }

    async fn read(&self, cancel: &CancellationToken) -> Result<Option<PortEvent>> {
        dispatch!(self, port => port.read(cancel).await)
    }

    async fn write(&self, data: &PortData) -> Result<()> {
        dispatch!(self, port => port.write(data).await)
    }

    async fn flush(&self) -> Result<()> {
        dispatch!(self, port => port.flush().await)
    }
}

/// The ports of one terminal, at most one per role.
///
/// Ports are shared with the workers through `Arc`s; cloning `Ports` clones
/// the handles, not the ports.
#[derive(Debug, Clone, Default)]
pub struct Ports {
    button: Option<Arc<AnyPort>>,
    relay: Option<Arc<AnyPort>>,
    printer: Option<Arc<AnyPort>>,
    scanner: Option<Arc<AnyPort>>,
}

impl Ports {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, role: Role) -> &mut Option<Arc<AnyPort>> {
        match role {
            Role::Button => &mut self.button,
            Role::Relay => &mut self.relay,
            Role::Printer => &mut self.printer,
            Role::Scanner => &mut self.scanner,
        }
    }

    /// Store `port` under its own role, replacing any previous one.
    pub fn insert(&mut self, port: AnyPort) {
        let role = port.role();
        *self.slot(role) = Some(Arc::new(port));
    }

    pub fn with(mut self, port: impl Into<AnyPort>) -> Self {
        self.insert(port.into());
        self
    }

    pub fn get(&self, role: Role) -> Option<&Arc<AnyPort>> {
        match role {
            Role::Button => self.button.as_ref(),
            Role::Relay => self.relay.as_ref(),
            Role::Printer => self.printer.as_ref(),
            Role::Scanner => self.scanner.as_ref(),
        }
    }

    /// Like [`get`](Self::get), failing for a missing role.
    pub fn require(&self, role: Role) -> Result<Arc<AnyPort>> {
        self.get(role)
            .cloned()
            .ok_or_else(|| HardwareError::configuration(format!("no {role} port configured")))
    }

    pub fn has(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    /// Roles that have a port.
    pub fn available(&self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|role| self.has(*role)).collect()
    }

    /// Open the ports of `roles`, stopping at the first failure.
    pub async fn open_roles(&self, roles: &[Role]) -> Result<()> {
        for role in roles {
            let port = self.require(*role)?;
            port.open().await?;
            debug!(port = %port.name(), "Port opened");
        }
        Ok(())
    }

    /// Close every open port, logging failures.
    pub async fn close_all(&self) {
        for role in Role::ALL {
            let Some(port) = self.get(role) else {
                continue;
            };
            if !port.is_open() {
                continue;
            }
            match port.close().await {
                Ok(()) => debug!(port = %port.name(), "Port closed"),
                Err(e) => error!(port = %port.name(), error = %e, "Failed to close port"),
            }
        }
    }
}
