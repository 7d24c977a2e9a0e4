//! Relay variants.
//!
//! Every relay follows the same pulse: wait the mode's delay (skipping the
//! activation entirely when the mode is disabled), engage, hold for the
//! period, release. Failures while engaging or releasing are reported as
//! [`HardwareError::PortWrite`].

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info};
use tollgate_core::{DeviceId, Pin, PinValue, Role};
use tollgate_network::{TcpGpioClient, TcpGpioClientConfig};
use tollgate_protocol::Message;

use super::{expect_activation, check_gpio};
use crate::error::{HardwareError, Result};
use crate::gpio::{Direction, GpioRegistry};
use crate::registry::PortId;
use crate::traits::Port;
use crate::types::{Activation, OpenFlag, PortData, RelayTiming};

/// Wait for the activation's delay. `false` when the mode is disabled.
async fn wait_delay(port: &str, timing: &RelayTiming, activation: Activation) -> bool {
    let Some(delay) = timing.delay_for(activation) else {
        debug!(port, %activation, "Relay activation disabled for this mode");
        return false;
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    true
}

/// Relay that only logs its activations.
#[derive(Debug)]
pub struct LogRelay {
    timing: RelayTiming,
    open: OpenFlag,
}

impl LogRelay {
    pub fn new(timing: RelayTiming) -> Self {
        Self {
            timing,
            open: OpenFlag::default(),
        }
    }
}

impl Port for LogRelay {
    fn role(&self) -> Role {
        Role::Relay
    }

    fn variant(&self) -> &'static str {
        "log"
    }

    async fn open(&self) -> Result<()> {
        self.open.set(true);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.open.set(false);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.get()
    }

    async fn write(&self, data: &PortData) -> Result<()> {
        let name = self.name();
        let activation = expect_activation(&name, data)?;
        if !wait_delay(&name, &self.timing, activation).await {
            return Ok(());
        }

        info!(%activation, "Relay ON");
        tokio::time::sleep(self.timing.period).await;
        info!(%activation, "Relay OFF");
        Ok(())
    }
}

/// Relay wired to a local GPIO output pin (active high).
#[derive(Debug)]
pub struct GpioRelay {
    pin: Pin,
    gpio: Arc<GpioRegistry>,
    id: PortId,
    timing: RelayTiming,
    open: OpenFlag,
}

impl GpioRelay {
    pub fn new(gpio: Arc<GpioRegistry>, pin: Pin, timing: RelayTiming) -> Self {
        let id = gpio.allocate_id();
        Self {
            pin,
            gpio,
            id,
            timing,
            open: OpenFlag::default(),
        }
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    fn set(&self, value: PinValue) -> Result<()> {
        self.gpio
            .subsystem()
            .write(self.pin, value)
            .map_err(|e| HardwareError::port_write(self.name(), e.to_string()))
    }
}

impl Port for GpioRelay {
    fn role(&self) -> Role {
        Role::Relay
    }

    fn variant(&self) -> &'static str {
        "gpio"
    }

    async fn open(&self) -> Result<()> {
        if self.open.get() {
            return Ok(());
        }

        self.gpio.register(self.id)?;
        let chip = self.gpio.subsystem();
        if let Err(e) = chip
            .setup(self.pin, Direction::Output)
            .and_then(|()| chip.write(self.pin, PinValue::Low))
        {
            self.gpio.unregister(self.id)?;
            return Err(e);
        }

        self.open.set(true);
        debug!(pin = %self.pin, "Relay opened");
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
        check_gpio(&self.gpio, self.id, self.pin, Direction::Output, &self.name())
    }

    async fn write(&self, data: &PortData) -> Result<()> {
        let name = self.name();
        let activation = expect_activation(&name, data)?;
        if !self.open.get() {
            return Err(HardwareError::disconnected(name));
        }
        if !wait_delay(&name, &self.timing, activation).await {
            return Ok(());
        }

        self.set(PinValue::High)?;
        debug!(pin = %self.pin, %activation, "Relay ON");
        tokio::time::sleep(self.timing.period).await;
        self.set(PinValue::Low)?;
        debug!(pin = %self.pin, %activation, "Relay OFF");
        Ok(())
    }
}

/// Relay on another device, driven through its TCPGPIO lock service.
///
/// Engaging sends an exclusive write HIGH, releasing an exclusive write LOW;
/// each is a separate connection waiting for the reply. A timeout on the
/// release leaves the remote pin engaged.
#[derive(Debug)]
pub struct TcpGpioRelay {
    server_addr: SocketAddr,
    pin: Pin,
    device_id: DeviceId,
    timeout: Duration,
    timing: RelayTiming,
    open: OpenFlag,
}

impl TcpGpioRelay {
    pub fn new(
        ip: IpAddr,
        port: u16,
        pin: Pin,
        device_id: DeviceId,
        timeout: Duration,
        timing: RelayTiming,
    ) -> Self {
        Self {
            server_addr: SocketAddr::new(ip, port),
            pin,
            device_id,
            timeout,
            timing,
            open: OpenFlag::default(),
        }
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    async fn set(&self, value: PinValue) -> Result<()> {
        let message = Message::exclusive_write(self.device_id.as_str(), self.pin, value)
            .map_err(|e| HardwareError::invalid_data(e.to_string()))?;

        let mut client = TcpGpioClient::new(TcpGpioClientConfig {
            server_addr: self.server_addr,
            timeout: self.timeout,
        });
        client
            .exchange(message)
            .await
            .map(|_| ())
            .map_err(|e| HardwareError::port_write(self.name(), e.to_string()))
    }
}

impl Port for TcpGpioRelay {
    fn role(&self) -> Role {
        Role::Relay
    }

    fn variant(&self) -> &'static str {
        "tcpgpio"
    }

    async fn open(&self) -> Result<()> {
        self.open.set(true);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.open.set(false);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.get()
    }

    async fn test(&self) -> Result<()> {
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.server_addr)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(HardwareError::port_test(self.name(), e.to_string())),
            Err(_) => Err(HardwareError::port_test(
                self.name(),
                format!("no answer from {} within {:?}", self.server_addr, self.timeout),
            )),
        }
    }

    async fn write(&self, data: &PortData) -> Result<()> {
        let name = self.name();
        let activation = expect_activation(&name, data)?;
        if !wait_delay(&name, &self.timing, activation).await {
            return Ok(());
        }

        self.set(PinValue::High).await?;
        debug!(server = %self.server_addr, pin = %self.pin, %activation, "Remote relay ON");
        tokio::time::sleep(self.timing.period).await;
        self.set(PinValue::Low).await?;
        debug!(server = %self.server_addr, pin = %self.pin, %activation, "Remote relay OFF");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{GpioChip, SimulatedGpio};
    use crate::types::TicketSlip;
    use chrono::Utc;

    fn quick() -> RelayTiming {
        RelayTiming {
            print_delay: Some(Duration::ZERO),
            scan_delay: None,
            period: Duration::from_millis(10),
        }
    }

    fn gpio_relay(sim: &SimulatedGpio) -> GpioRelay {
        let registry = Arc::new(GpioRegistry::new(GpioChip::new(sim.clone())));
        GpioRelay::new(registry, Pin::new(12).unwrap(), quick())
    }

    #[tokio::test]
    async fn test_gpio_relay_pulse() {
        let sim = SimulatedGpio::new();
        let relay = gpio_relay(&sim);
        relay.open().await.unwrap();

        relay.write(&PortData::Activate(Activation::Print)).await.unwrap();

        let pin = Pin::new(12).unwrap();
        assert_eq!(
            sim.writes(),
            vec![(pin, PinValue::Low), (pin, PinValue::High), (pin, PinValue::Low)]
        );
    }

    #[tokio::test]
    async fn test_gpio_relay_disabled_mode() {
        let sim = SimulatedGpio::new();
        let relay = gpio_relay(&sim);
        relay.open().await.unwrap();

        relay.write(&PortData::Activate(Activation::Scan)).await.unwrap();
        assert_eq!(sim.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_gpio_relay_requires_open() {
        let sim = SimulatedGpio::new();
        let relay = gpio_relay(&sim);
        let result = relay.write(&PortData::Activate(Activation::Print)).await;
        assert!(matches!(result, Err(HardwareError::Disconnected { .. })));
    }

    #[tokio::test]
    async fn test_relay_rejects_ticket() {
        let relay = LogRelay::new(quick());
        let slip = TicketSlip {
            code: "ABC".into(),
            issued_at: Utc::now(),
            valid_until: Utc::now(),
            title: None,
        };
        let result = relay.write(&PortData::Ticket(slip)).await;
        assert!(matches!(result, Err(HardwareError::InvalidData { .. })));
    }

    #[tokio::test]
    async fn test_tcpgpio_relay_unreachable_is_port_write() {
        // Bind then drop to get a port nobody listens on
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let relay = TcpGpioRelay::new(
            addr.ip(),
            addr.port(),
            Pin::new(18).unwrap(),
            DeviceId::new("gate1").unwrap(),
            Duration::from_millis(200),
            quick(),
        );

        let result = relay.write(&PortData::Activate(Activation::Print)).await;
        assert!(result.unwrap_err().is_port_write());
        assert!(matches!(
            relay.test().await,
            Err(HardwareError::PortTest { .. })
        ));
    }
}
