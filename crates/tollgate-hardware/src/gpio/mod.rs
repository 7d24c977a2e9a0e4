//! GPIO subsystem.
//!
//! Pins are addressed by physical board number ([`Pin`]); backends translate
//! to controller lines themselves. [`GpioChip`] wraps a backend so it can be
//! shared by every GPIO port through a [`GpioRegistry`], and also serves as
//! the pin writer of the TCPGPIO lock service.

mod simulated;
mod sysfs;

pub use simulated::SimulatedGpio;
pub use sysfs::{DEFAULT_SYSFS_ROOT, SysfsGpio};

use std::fmt;
use std::sync::Arc;
use tollgate_core::{Pin, PinValue};
use tollgate_network::PinWriter;

use crate::error::{HardwareError, Result};
use crate::registry::{HardwareRegistry, Subsystem};

/// Registry shared by all GPIO ports of a process.
pub type GpioRegistry = HardwareRegistry<GpioChip>;

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "in",
            Direction::Output => "out",
        }
    }
}

/// Low level access to a GPIO controller.
pub trait GpioBackend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Prepare the controller. Called once by the registry.
    fn initialize(&self) -> Result<()>;

    /// Release every pin still set up. Called once by the registry.
    fn cleanup(&self) -> Result<()>;

    /// Configure a pin. Calling it again for the same pin is allowed.
    fn setup(&self, pin: Pin, direction: Direction) -> Result<()>;

    /// Give a pin back to the controller.
    fn release(&self, pin: Pin) -> Result<()>;

    fn read(&self, pin: Pin) -> Result<PinValue>;

    /// Drive an output pin. `PinValue::Unset` is rejected.
    fn write(&self, pin: Pin, value: PinValue) -> Result<()>;
}

/// BCM controller line of a physical board pin.
///
/// # Example
///
/// ```
/// use tollgate_core::Pin;
/// use tollgate_hardware::gpio::bcm_line;
///
/// assert_eq!(bcm_line(Pin::new(18).unwrap()), 24);
/// assert_eq!(bcm_line(Pin::new(3).unwrap()), 2);
/// ```
pub fn bcm_line(pin: Pin) -> u8 {
    match pin.number() {
        3 => 2,
        5 => 3,
        7 => 4,
        8 => 14,
        10 => 15,
        11 => 17,
        12 => 18,
        13 => 27,
        15 => 22,
        16 => 23,
        18 => 24,
        19 => 10,
        21 => 9,
        22 => 25,
        23 => 11,
        24 => 8,
        26 => 7,
        // Pin construction rejects everything else
        other => other,
    }
}

/// Shared handle to a GPIO backend.
#[derive(Debug, Clone)]
pub struct GpioChip {
    backend: Arc<dyn GpioBackend>,
}

impl GpioChip {
    pub fn new(backend: impl GpioBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn backend(&self) -> &dyn GpioBackend {
        self.backend.as_ref()
    }

    pub fn setup(&self, pin: Pin, direction: Direction) -> Result<()> {
        self.backend.setup(pin, direction)
    }

    pub fn release(&self, pin: Pin) -> Result<()> {
        self.backend.release(pin)
    }

    pub fn read(&self, pin: Pin) -> Result<PinValue> {
        self.backend.read(pin)
    }

    pub fn write(&self, pin: Pin, value: PinValue) -> Result<()> {
        self.backend.write(pin, value)
    }
}

impl Subsystem for GpioChip {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn initialize(&self) -> Result<()> {
        self.backend.initialize()
    }

    fn cleanup(&self) -> Result<()> {
        self.backend.cleanup()
    }
}

impl PinWriter for GpioChip {
    type Error = HardwareError;

    fn write_pin(&self, pin: Pin, value: PinValue) -> Result<()> {
        if value == PinValue::Unset {
            return Err(HardwareError::invalid_data(format!(
                "invalid GPIO pin value {value} for pin {pin}"
            )));
        }
        self.backend.setup(pin, Direction::Output)?;
        self.backend.write(pin, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bcm_lines_are_unique() {
        let lines: HashSet<u8> = Pin::all().map(bcm_line).collect();
        assert_eq!(lines.len(), 17);
    }

    #[test]
    fn test_pin_writer_configures_output() {
        let sim = SimulatedGpio::new();
        let chip = GpioChip::new(sim.clone());
        let pin = Pin::new(18).unwrap();

        chip.write_pin(pin, PinValue::High).unwrap();
        assert_eq!(sim.level(pin), PinValue::High);
        assert_eq!(sim.direction(pin), Some(Direction::Output));
    }

    #[test]
    fn test_pin_writer_rejects_unset() {
        let sim = SimulatedGpio::new();
        let chip = GpioChip::new(sim.clone());

        let result = chip.write_pin(Pin::new(18).unwrap(), PinValue::Unset);
        assert!(matches!(result, Err(HardwareError::InvalidData { .. })));
        assert!(sim.writes().is_empty());
    }
}
