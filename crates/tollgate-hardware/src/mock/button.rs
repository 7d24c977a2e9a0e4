use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tollgate_core::Role;

use super::MOCK_READ_TIMEOUT;
use crate::error::{HardwareError, Result};
use crate::traits::Port;
use crate::types::{OpenFlag, PortEvent};

/// Button pressed programmatically through a [`MockButtonHandle`].
///
/// Dropping every handle makes the next read fail with a disconnected error.
///
/// # Examples
///
/// ```
/// use tokio_util::sync::CancellationToken;
/// use tollgate_hardware::mock::MockButton;
/// use tollgate_hardware::{Port, PortEvent};
///
/// #[tokio::main]
/// async fn main() -> tollgate_hardware::Result<()> {
///     let (button, handle) = MockButton::new();
///     button.open().await?;
///
///     handle.press();
///     let event = button.read(&CancellationToken::new()).await?;
///     assert_eq!(event, Some(PortEvent::Trigger));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockButton {
    presses: Mutex<mpsc::UnboundedReceiver<()>>,
    flushes: Arc<AtomicUsize>,
    read_timeout: Duration,
    open: OpenFlag,
}

impl MockButton {
    pub fn new() -> (Self, MockButtonHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let flushes = Arc::new(AtomicUsize::new(0));

        let button = Self {
            presses: Mutex::new(rx),
            flushes: Arc::clone(&flushes),
            read_timeout: MOCK_READ_TIMEOUT,
            open: OpenFlag::default(),
        };
        (button, MockButtonHandle { tx, flushes })
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl Port for MockButton {
    fn role(&self) -> Role {
        Role::Button
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

    async fn read(&self, cancel: &CancellationToken) -> Result<Option<PortEvent>> {
        if !self.open.get() {
            return Err(HardwareError::disconnected(self.name()));
        }

        let mut presses = self.presses.lock().await;
        tokio::select! {
            _ = cancel.cancelled() => Ok(None),
            _ = tokio::time::sleep(self.read_timeout) => Ok(None),
            press = presses.recv() => match press {
                Some(()) => Ok(Some(PortEvent::Trigger)),
                None => Err(HardwareError::disconnected("mock button handle dropped")),
            },
        }
    }

    async fn flush(&self) -> Result<()> {
        let mut presses = self.presses.lock().await;
        while presses.try_recv().is_ok() {}
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Handle for pressing a [`MockButton`].
#[derive(Debug, Clone)]
pub struct MockButtonHandle {
    tx: mpsc::UnboundedSender<()>,
    flushes: Arc<AtomicUsize>,
}

impl MockButtonHandle {
    /// Queue one press. Ignored once the button is gone.
    pub fn press(&self) {
        let _ = self.tx.send(());
    }

    /// Number of times the button was flushed.
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}
