//! Configuration driven port construction.
//!
//! A port value has the form `variant[:arg1[,arg2[,...]]]`. The variant name
//! is looked up in a table of named constructors for the role; the
//! constructor validates the positional arguments and builds the port
//! without touching hardware. [`PortFactory::create`] then runs the port's
//! self-test. Any failure leaves the role without a port; whether that is
//! fatal is decided by mode resolution.
//!
//! # Examples
//!
//! ```
//! use tollgate_hardware::factory::PortSpec;
//!
//! let spec = PortSpec::parse("tcpgpio:10.0.0.7,7777,18").unwrap();
//! assert_eq!(spec.variant, "tcpgpio");
//! assert_eq!(spec.args, ["10.0.0.7", "7777", "18"]);
//!
//! let spec = PortSpec::parse("log").unwrap();
//! assert!(spec.args.is_empty());
//! ```

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tollgate_core::constants::{DEFAULT_GPIO_PIN, PORT_READ_TIMEOUT_MS, TCPGPIO_TIMEOUT_MS};
use tollgate_core::{DeviceId, Pin, Role};

use crate::devices::{AnyPort, Ports};
use crate::error::{HardwareError, Result};
use crate::gpio::GpioRegistry;
use crate::ports::printer::{DEFAULT_BAUD_RATE, DEFAULT_PRINT_FILE, DEFAULT_PRINT_WIDTH};
use crate::ports::scanner::{DEFAULT_SCANNER_FIFO, DEFAULT_SCANNER_SOCKET};
use crate::ports::{
    FifoScanner, FilePrinter, GpioButton, GpioRelay, LogPrinter, LogRelay, SerialPrinter,
    SocketScanner, TcpGpioRelay,
};
use crate::traits::Port;
use crate::types::RelayTiming;

/// Parsed port configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub variant: String,
    pub args: Vec<String>,
}

impl PortSpec {
    /// Parse `variant[:arg1[,arg2...]]`. Surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let (variant, args) = match value.split_once(':') {
            Some((variant, args)) => (variant.trim(), Some(args)),
            None => (value, None),
        };

        if variant.is_empty() {
            return Err(HardwareError::configuration(format!(
                "missing port variant in {value:?}"
            )));
        }

        let args = args
            .map(|args| args.split(',').map(|a| a.trim().to_string()).collect())
            .unwrap_or_default();

        Ok(Self {
            variant: variant.to_string(),
            args,
        })
    }

    /// Positional argument `index`, if present and non-empty.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }

    fn parse_arg<T>(&self, index: usize, what: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.arg(index)
            .map(|raw| {
                raw.parse().map_err(|e| {
                    HardwareError::configuration(format!("invalid {what} {raw:?}: {e}"))
                })
            })
            .transpose()
    }

    fn require_arg<T>(&self, index: usize, what: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.parse_arg(index, what)?.ok_or_else(|| {
            HardwareError::configuration(format!("{} port requires {what}", self.variant))
        })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.variant)?;
        if !self.args.is_empty() {
            write!(f, ":{}", self.args.join(","))?;
        }
        Ok(())
    }
}

/// Settings shared by the constructors.
#[derive(Debug, Clone)]
pub struct PortSettings {
    /// Identity used on the TCPGPIO wire.
    pub device_id: Option<DeviceId>,
    pub relay: RelayTiming,
    pub tcpgpio_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            device_id: None,
            relay: RelayTiming::default(),
            tcpgpio_timeout: Duration::from_millis(TCPGPIO_TIMEOUT_MS),
            read_timeout: Duration::from_millis(PORT_READ_TIMEOUT_MS),
        }
    }
}

type Constructor = fn(&PortFactory, &PortSpec) -> Result<AnyPort>;

const CONSTRUCTORS: &[(Role, &str, Constructor)] = &[
    (Role::Button, "gpio", PortFactory::gpio_button),
    (Role::Relay, "log", PortFactory::log_relay),
    (Role::Relay, "gpio", PortFactory::gpio_relay),
    (Role::Relay, "tcpgpio", PortFactory::tcpgpio_relay),
    (Role::Printer, "log", PortFactory::log_printer),
    (Role::Printer, "file", PortFactory::file_printer),
    (Role::Printer, "serial", PortFactory::serial_printer),
    (Role::Scanner, "socket", PortFactory::socket_scanner),
    (Role::Scanner, "fifo", PortFactory::fifo_scanner),
];

/// Variant names available for `role`.
pub fn variants(role: Role) -> impl Iterator<Item = &'static str> {
    CONSTRUCTORS
        .iter()
        .filter(move |(r, _, _)| *r == role)
        .map(|(_, name, _)| *name)
}

/// Builds ports from configuration values.
#[derive(Debug, Clone)]
pub struct PortFactory {
    gpio: Arc<GpioRegistry>,
    settings: PortSettings,
}

impl PortFactory {
    pub fn new(gpio: Arc<GpioRegistry>, settings: PortSettings) -> Self {
        Self { gpio, settings }
    }

    pub fn settings(&self) -> &PortSettings {
        &self.settings
    }

    /// Construct the port described by `spec` without testing it.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` for an unknown variant or bad arguments.
    pub fn build(&self, role: Role, spec: &PortSpec) -> Result<AnyPort> {
        let constructor = CONSTRUCTORS
            .iter()
            .find(|(r, name, _)| *r == role && *name == spec.variant)
            .map(|(_, _, constructor)| constructor)
            .ok_or_else(|| {
                HardwareError::configuration(format!(
                    "unknown {role} variant {:?} (available: {})",
                    spec.variant,
                    variants(role).collect::<Vec<_>>().join(", ")
                ))
            })?;
        constructor(self, spec)
    }

    /// Build and self-test the port for `role`.
    ///
    /// `None` when the role is not configured or the port is unusable; the
    /// reason is logged.
    pub async fn create(&self, role: Role, value: Option<&str>) -> Option<AnyPort> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;

        let port = match PortSpec::parse(value).and_then(|spec| self.build(role, &spec)) {
            Ok(port) => port,
            Err(e) => {
                error!(%role, value, error = %e, "Failed to construct port");
                return None;
            }
        };

        if let Err(e) = port.test().await {
            warn!(port = %port.name(), error = %e, "Port test failed, port disabled");
            return None;
        }

        info!(port = %port.name(), value, "Port available");
        Some(port)
    }

    /// Create a port for every configured role.
    pub async fn create_all<'a>(
        &self,
        values: impl IntoIterator<Item = (Role, Option<&'a str>)>,
    ) -> Ports {
        let mut ports = Ports::new();
        for (role, value) in values {
            if let Some(port) = self.create(role, value).await {
                ports.insert(port);
            }
        }
        ports
    }

    fn pin_arg(spec: &PortSpec, index: usize) -> Result<Pin> {
        match spec.parse_arg::<Pin>(index, "pin")? {
            Some(pin) => Ok(pin),
            None => Pin::new(DEFAULT_GPIO_PIN)
                .map_err(|e| HardwareError::configuration(e.to_string())),
        }
    }

    fn gpio_button(&self, spec: &PortSpec) -> Result<AnyPort> {
        let pin = Self::pin_arg(spec, 0)?;
        let button = GpioButton::new(Arc::clone(&self.gpio), pin)
            .with_read_timeout(self.settings.read_timeout);
        Ok(button.into())
    }

    fn log_relay(&self, _spec: &PortSpec) -> Result<AnyPort> {
        Ok(LogRelay::new(self.settings.relay).into())
    }

    fn gpio_relay(&self, spec: &PortSpec) -> Result<AnyPort> {
        let pin = Self::pin_arg(spec, 0)?;
        Ok(GpioRelay::new(Arc::clone(&self.gpio), pin, self.settings.relay).into())
    }

    fn tcpgpio_relay(&self, spec: &PortSpec) -> Result<AnyPort> {
        let ip: IpAddr = spec.require_arg(0, "ip address")?;
        let port: u16 = spec.require_arg(1, "port")?;
        let pin: Pin = spec.require_arg(2, "pin")?;
        let device_id = self.settings.device_id.clone().ok_or_else(|| {
            HardwareError::configuration("tcpgpio relay requires a device id")
        })?;

        Ok(TcpGpioRelay::new(
            ip,
            port,
            pin,
            device_id,
            self.settings.tcpgpio_timeout,
            self.settings.relay,
        )
        .into())
    }

    fn log_printer(&self, _spec: &PortSpec) -> Result<AnyPort> {
        Ok(LogPrinter::new().into())
    }

    fn file_printer(&self, spec: &PortSpec) -> Result<AnyPort> {
        let path = spec.arg(0).unwrap_or(DEFAULT_PRINT_FILE);
        let width = spec
            .parse_arg::<usize>(1, "width")?
            .unwrap_or(DEFAULT_PRINT_WIDTH);
        if width == 0 {
            return Err(HardwareError::configuration("print width must be positive"));
        }
        Ok(FilePrinter::new(PathBuf::from(path), width).into())
    }

    fn serial_printer(&self, spec: &PortSpec) -> Result<AnyPort> {
        let device: String = spec.require_arg(0, "serial device")?;
        let baud = spec
            .parse_arg::<u32>(1, "baud rate")?
            .unwrap_or(DEFAULT_BAUD_RATE);
        Ok(SerialPrinter::new(device, baud).into())
    }

    fn socket_scanner(&self, spec: &PortSpec) -> Result<AnyPort> {
        let path = spec.arg(0).unwrap_or(DEFAULT_SCANNER_SOCKET);
        let scanner = SocketScanner::new(path).with_read_timeout(self.settings.read_timeout);
        Ok(scanner.into())
    }

    fn fifo_scanner(&self, spec: &PortSpec) -> Result<AnyPort> {
        let path = spec.arg(0).unwrap_or(DEFAULT_SCANNER_FIFO);
        let scanner = FifoScanner::new(path).with_read_timeout(self.settings.read_timeout);
        Ok(scanner.into())
    }
}
