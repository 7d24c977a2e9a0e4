//! Concrete port variants.

pub mod button;
pub mod printer;
pub mod relay;
pub mod scanner;

pub use button::GpioButton;
pub use printer::{FilePrinter, LogPrinter, SerialPrinter};
pub use relay::{GpioRelay, LogRelay, TcpGpioRelay};
pub use scanner::{FifoScanner, SocketScanner};

use tollgate_core::Pin;

use crate::error::{HardwareError, Result};
use crate::gpio::{Direction, GpioRegistry};
use crate::registry::PortId;
use crate::types::{Activation, PortData, TicketSlip};

/// Register, configure and release a pin to prove the GPIO subsystem works.
pub(crate) fn check_gpio(
    gpio: &GpioRegistry,
    id: PortId,
    pin: Pin,
    direction: Direction,
    port: &str,
) -> Result<()> {
    let failed = |e: HardwareError| HardwareError::port_test(port, e.to_string());

    gpio.register(id).map_err(failed)?;
    let configured = gpio.subsystem().setup(pin, direction);
    let released = gpio.subsystem().release(pin);
    let unregistered = gpio.unregister(id);

    configured.and(released).and(unregistered).map_err(failed)
}

pub(crate) fn expect_activation(port: &str, data: &PortData) -> Result<Activation> {
    match data {
        PortData::Activate(activation) => Ok(*activation),
        PortData::Ticket(_) => Err(HardwareError::invalid_data(format!(
            "{port} expects a relay activation"
        ))),
    }
}

pub(crate) fn expect_ticket<'a>(port: &str, data: &'a PortData) -> Result<&'a TicketSlip> {
    match data {
        PortData::Ticket(slip) => Ok(slip),
        PortData::Activate(_) => Err(HardwareError::invalid_data(format!(
            "{port} expects a ticket"
        ))),
    }
}
