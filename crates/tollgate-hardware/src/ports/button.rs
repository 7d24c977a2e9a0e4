//! GPIO push button.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use tollgate_core::constants::{BUTTON_BOUNCE_MS, BUTTON_POLL_INTERVAL_MS, PORT_READ_TIMEOUT_MS};
use tollgate_core::{Pin, PinValue, Role};

use super::check_gpio;
use crate::error::{HardwareError, Result};
use crate::gpio::{Direction, GpioRegistry};
use crate::registry::PortId;
use crate::traits::Port;
use crate::types::{OpenFlag, PortEvent};

/// Rising edge detector with bounce suppression.
#[derive(Debug)]
struct EdgeDetector {
    last: PinValue,
    last_trigger: Option<Instant>,
}

impl EdgeDetector {
    fn new() -> Self {
        Self {
            last: PinValue::Low,
            last_trigger: None,
        }
    }

    /// Feed one sample; true on an accepted rising edge.
    fn sample(&mut self, level: PinValue, now: Instant, bounce: Duration) -> bool {
        let rising = self.last == PinValue::Low && level == PinValue::High;
        self.last = level;
        if !rising {
            return false;
        }

        if let Some(previous) = self.last_trigger {
            if now.duration_since(previous) < bounce {
                return false;
            }
        }
        self.last_trigger = Some(now);
        true
    }

    fn resync(&mut self, level: PinValue) {
        self.last = level;
    }
}

/// Button wired to a GPIO input pin (active high).
///
/// `read` polls the pin every few milliseconds until a rising edge, the read
/// timeout or cancellation. Edges closer than the bounce interval to the
/// previous press are ignored.
#[derive(Debug)]
pub struct GpioButton {
    pin: Pin,
    gpio: Arc<GpioRegistry>,
    id: PortId,
    read_timeout: Duration,
    bounce: Duration,
    edge: Mutex<EdgeDetector>,
    open: OpenFlag,
}

impl GpioButton {
    pub fn new(gpio: Arc<GpioRegistry>, pin: Pin) -> Self {
        let id = gpio.allocate_id();
        Self {
            pin,
            gpio,
            id,
            read_timeout: Duration::from_millis(PORT_READ_TIMEOUT_MS),
            bounce: Duration::from_millis(BUTTON_BOUNCE_MS),
            edge: Mutex::new(EdgeDetector::new()),
            open: OpenFlag::default(),
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_bounce(mut self, bounce: Duration) -> Self {
        self.bounce = bounce;
        self
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    fn edge(&self) -> MutexGuard<'_, EdgeDetector> {
        self.edge.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn level(&self) -> Result<PinValue> {
        self.gpio.subsystem().read(self.pin)
    }
}

impl Port for GpioButton {
    fn role(&self) -> Role {
        Role::Button
    }

    fn variant(&self) -> &'static str {
        "gpio"
    }

    async fn open(&self) -> Result<()> {
        if self.open.get() {
            return Ok(());
        }

        self.gpio.register(self.id)?;
        let level = match self
            .gpio
            .subsystem()
            .setup(self.pin, Direction::Input)
            .and_then(|()| self.level())
        {
            Ok(level) => level,
            Err(e) => {
                self.gpio.unregister(self.id)?;
                return Err(e);
            }
        };

        self.edge().resync(level);
        self.open.set(true);
        debug!(pin = %self.pin, "Button opened");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.open.set(false) {
            return Ok(());
        }

        let released = self.gpio.subsystem().release(self.pin);
        self.gpio.unregister(self.id)?;
        released
    }

    fn is_open(&self) -> bool {
        self.open.get()
    }

    async fn test(&self) -> Result<()> {
        if self.open.get() {
            return Ok(());
        }
        check_gpio(&self.gpio, self.id, self.pin, Direction::Input, &self.name())
    }

    async fn read(&self, cancel: &CancellationToken) -> Result<Option<PortEvent>> {
        if !self.open.get() {
            return Err(HardwareError::disconnected(self.name()));
        }

        let deadline = Instant::now() + self.read_timeout;
        let mut poll = tokio::time::interval(Duration::from_millis(BUTTON_POLL_INTERVAL_MS));
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = poll.tick() => {}
            }

            let level = self.level()?;
            if self.edge().sample(level, Instant::now(), self.bounce) {
                debug!(pin = %self.pin, "Button pressed");
                return Ok(Some(PortEvent::Trigger));
            }
            if Instant::now() >= deadline {
                trace!(pin = %self.pin, "Button read timed out");
                return Ok(None);
            }
        }
    }

    async fn flush(&self) -> Result<()> {
        if self.open.get() {
            let level = self.level()?;
            self.edge().resync(level);
        }
        Ok(())
    }
}
