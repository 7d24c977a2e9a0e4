use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;
use tollgate_core::{Pin, PinValue};

use super::{Direction, GpioBackend};
use crate::error::{HardwareError, Result};

#[derive(Debug, Default)]
struct State {
    directions: HashMap<Pin, Direction>,
    levels: HashMap<Pin, PinValue>,
    writes: Vec<(Pin, PinValue)>,
}

/// In-memory GPIO controller.
///
/// Used on machines without GPIO hardware and in tests. Clones share state,
/// so a test can keep one clone to drive inputs and inspect writes.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGpio {
    state: Arc<Mutex<State>>,
    inits: Arc<AtomicUsize>,
    cleanups: Arc<AtomicUsize>,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate an external level on an input pin.
    pub fn set_input(&self, pin: Pin, value: PinValue) {
        self.state().levels.insert(pin, value);
    }

    /// Current level of a pin (low if never driven).
    pub fn level(&self, pin: Pin) -> PinValue {
        self.state().levels.get(&pin).copied().unwrap_or(PinValue::Low)
    }

    pub fn direction(&self, pin: Pin) -> Option<Direction> {
        self.state().directions.get(&pin).copied()
    }

    /// Every write performed so far, in order.
    pub fn writes(&self) -> Vec<(Pin, PinValue)> {
        self.state().writes.clone()
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn cleanup_count(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

impl GpioBackend for SimulatedGpio {
    fn name(&self) -> &str {
        "simulated-gpio"
    }

    fn initialize(&self) -> Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cleanup(&self) -> Result<()> {
        self.state().directions.clear();
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn setup(&self, pin: Pin, direction: Direction) -> Result<()> {
        self.state().directions.insert(pin, direction);
        Ok(())
    }

    fn release(&self, pin: Pin) -> Result<()> {
        self.state().directions.remove(&pin);
        Ok(())
    }

    fn read(&self, pin: Pin) -> Result<PinValue> {
        let state = self.state();
        if !state.directions.contains_key(&pin) {
            return Err(HardwareError::communication(format!("pin {pin} is not set up")));
        }
        Ok(state.levels.get(&pin).copied().unwrap_or(PinValue::Low))
    }

    fn write(&self, pin: Pin, value: PinValue) -> Result<()> {
        if value == PinValue::Unset {
            return Err(HardwareError::invalid_data(format!(
                "invalid GPIO pin value {value} for pin {pin}"
            )));
        }

        let mut state = self.state();
        if state.directions.get(&pin) != Some(&Direction::Output) {
            return Err(HardwareError::communication(format!(
                "pin {pin} is not set up as output"
            )));
        }
        state.levels.insert(pin, value);
        state.writes.push((pin, value));
        drop(state);

        info!(pin = %pin, value = %value, "Simulated GPIO pin set");
        Ok(())
    }
}
