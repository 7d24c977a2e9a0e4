//! Remote relay driving a lock service whose pins live on a simulated chip.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tollgate_core::{DeviceId, Pin, PinValue};
use tollgate_hardware::gpio::{GpioChip, SimulatedGpio};
use tollgate_hardware::ports::TcpGpioRelay;
use tollgate_hardware::{Activation, Port, PortData, RelayTiming};
use tollgate_network::{LockService, LockServiceConfig, LockServiceError, TcpGpioClient, TcpGpioClientConfig};
use tollgate_protocol::Message;

struct Remote {
    addr: SocketAddr,
    gpio: SimulatedGpio,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), LockServiceError>>,
}

impl Remote {
    async fn start() -> Self {
        let gpio = SimulatedGpio::new();
        let config = LockServiceConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..LockServiceConfig::default()
        };
        let service = LockService::bind(config, GpioChip::new(gpio.clone()))
            .await
            .unwrap();
        let addr = service.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(service.run(cancel.clone()));
        Self {
            addr,
            gpio,
            cancel,
            task,
        }
    }

    fn relay(&self, device: &str, timing: RelayTiming) -> TcpGpioRelay {
        TcpGpioRelay::new(
            self.addr.ip(),
            self.addr.port(),
            pin(),
            DeviceId::new(device).unwrap(),
            Duration::from_millis(500),
            timing,
        )
    }

    async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

fn pin() -> Pin {
    Pin::new(18).unwrap()
}

fn timing() -> RelayTiming {
    RelayTiming {
        print_delay: Some(Duration::ZERO),
        scan_delay: Some(Duration::ZERO),
        period: Duration::from_millis(20),
    }
}

#[tokio::test]
async fn test_remote_relay_pulses_pin() {
    let remote = Remote::start().await;
    let relay = remote.relay("gate1", timing());

    relay.test().await.unwrap();
    relay.open().await.unwrap();
    relay.write(&PortData::Activate(Activation::Print)).await.unwrap();

    assert_eq!(
        remote.gpio.writes(),
        vec![(pin(), PinValue::High), (pin(), PinValue::Low)]
    );
    remote.stop().await;
}

#[tokio::test]
async fn test_remote_relay_times_out_on_locked_pin() {
    let remote = Remote::start().await;

    // Another device holds the pin HIGH
    let mut other = TcpGpioClient::new(TcpGpioClientConfig {
        server_addr: remote.addr,
        timeout: Duration::from_millis(500),
    });
    other
        .exchange(Message::exclusive_write("gate2", pin(), PinValue::High).unwrap())
        .await
        .unwrap();

    let relay = remote.relay("gate1", timing());
    let result = relay.write(&PortData::Activate(Activation::Scan)).await;
    assert!(result.unwrap_err().is_port_write());
    assert_eq!(remote.gpio.writes(), vec![(pin(), PinValue::High)]);

    remote.stop().await;
}

#[tokio::test]
async fn test_disabled_mode_sends_nothing() {
    let remote = Remote::start().await;
    let relay = remote.relay(
        "gate1",
        RelayTiming {
            scan_delay: None,
            ..timing()
        },
    );

    relay.write(&PortData::Activate(Activation::Scan)).await.unwrap();
    assert!(remote.gpio.writes().is_empty());
    remote.stop().await;
}
