use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tollgate_core::Role;

use crate::error::{HardwareError, Result};
use crate::ports::expect_activation;
use crate::traits::Port;
use crate::types::{Activation, OpenFlag, PortData};

#[derive(Debug, Default)]
struct Shared {
    activations: Mutex<Vec<Activation>>,
    fail: AtomicBool,
}

/// Relay that records its activations.
#[derive(Debug)]
pub struct MockRelay {
    shared: Arc<Shared>,
    open: OpenFlag,
    period: Duration,
}

impl MockRelay {
    pub fn new() -> (Self, MockRelayHandle) {
        let shared = Arc::new(Shared::default());
        let relay = Self {
            shared: Arc::clone(&shared),
            open: OpenFlag::default(),
            period: Duration::ZERO,
        };
        (relay, MockRelayHandle { shared })
    }

    /// Keep each write engaged for `period` after recording it.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

impl Port for MockRelay {
    fn role(&self) -> Role {
        Role::Relay
    }

    fn variant(&self) -> &'static str {
        "mock"
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
        let activation = expect_activation(&self.name(), data)?;
        if self.shared.fail.load(Ordering::SeqCst) {
            return Err(HardwareError::port_write(self.name(), "simulated relay failure"));
        }
        self.shared
            .activations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(activation);
        if !self.period.is_zero() {
            tokio::time::sleep(self.period).await;
        }
        Ok(())
    }
}

/// Inspects and controls a [`MockRelay`].
#[derive(Debug, Clone)]
pub struct MockRelayHandle {
    shared: Arc<Shared>,
}

impl MockRelayHandle {
    pub fn activations(&self) -> Vec<Activation> {
        self.shared
            .activations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make subsequent writes fail with a port-write error.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail.store(fail, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_fails() {
        let (relay, handle) = MockRelay::new();
        relay.write(&PortData::Activate(Activation::Scan)).await.unwrap();
        assert_eq!(handle.activations(), vec![Activation::Scan]);

        handle.fail_writes(true);
        let result = relay.write(&PortData::Activate(Activation::Print)).await;
        assert!(result.unwrap_err().is_port_write());
        assert_eq!(handle.activations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_period_holds_write() {
        let (relay, handle) = MockRelay::new();
        let relay = relay.with_period(Duration::from_secs(3));

        let started = tokio::time::Instant::now();
        relay.write(&PortData::Activate(Activation::Print)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(handle.activations(), vec![Activation::Print]);
    }
}
