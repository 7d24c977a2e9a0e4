//! Shared helpers for lock service integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tollgate_core::{Pin, PinValue};
use tollgate_network::{
    LockService, LockServiceConfig, LockServiceError, PinWriter, TcpGpioClient,
    TcpGpioClientConfig,
};

/// Pin writer that records every write.
#[derive(Clone, Default)]
pub struct RecordingPins {
    writes: Arc<Mutex<Vec<(u8, PinValue)>>>,
}

impl RecordingPins {
    pub fn writes(&self) -> Vec<(u8, PinValue)> {
        self.writes.lock().unwrap().clone()
    }
}

impl PinWriter for RecordingPins {
    type Error = String;

    fn write_pin(&self, pin: Pin, value: PinValue) -> Result<(), Self::Error> {
        if value == PinValue::Unset {
            return Err("NONE is not a pin level".to_string());
        }
        self.writes.lock().unwrap().push((pin.number(), value));
        Ok(())
    }
}

pub struct RunningService {
    pub addr: SocketAddr,
    pub pins: RecordingPins,
    pub cancel: CancellationToken,
    pub task: JoinHandle<Result<(), LockServiceError>>,
}

impl RunningService {
    pub fn client(&self, timeout: Duration) -> TcpGpioClient {
        TcpGpioClient::new(TcpGpioClientConfig {
            server_addr: self.addr,
            timeout,
        })
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(2), self.task).await;
    }
}

/// Start a lock service on an ephemeral local port.
pub async fn start_service() -> RunningService {
    let pins = RecordingPins::default();
    let config = LockServiceConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        ..LockServiceConfig::default()
    };

    let service = LockService::bind(config, pins.clone()).await.unwrap();
    let addr = service.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(service.run(cancel.clone()));

    RunningService {
        addr,
        pins,
        cancel,
        task,
    }
}
