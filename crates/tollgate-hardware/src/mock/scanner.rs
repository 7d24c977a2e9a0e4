use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tollgate_core::Role;

use super::MOCK_READ_TIMEOUT;
use crate::error::{HardwareError, Result};
use crate::traits::Port;
use crate::types::{OpenFlag, PortEvent};

/// Scanner fed programmatically through a [`MockScannerHandle`].
#[derive(Debug)]
pub struct MockScanner {
    codes: Mutex<mpsc::UnboundedReceiver<String>>,
    flushes: Arc<AtomicUsize>,
    fail_flush: Arc<AtomicBool>,
    read_timeout: Duration,
    open: OpenFlag,
}

impl MockScanner {
    pub fn new() -> (Self, MockScannerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let flushes = Arc::new(AtomicUsize::new(0));
        let fail_flush = Arc::new(AtomicBool::new(false));

        let scanner = Self {
            codes: Mutex::new(rx),
            flushes: Arc::clone(&flushes),
            fail_flush: Arc::clone(&fail_flush),
            read_timeout: MOCK_READ_TIMEOUT,
            open: OpenFlag::default(),
        };
        (
            scanner,
            MockScannerHandle {
                tx,
                flushes,
                fail_flush,
            },
        )
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl Port for MockScanner {
    fn role(&self) -> Role {
        Role::Scanner
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

        let mut codes = self.codes.lock().await;
        tokio::select! {
            _ = cancel.cancelled() => Ok(None),
            _ = tokio::time::sleep(self.read_timeout) => Ok(None),
            code = codes.recv() => match code {
                Some(code) => Ok(Some(PortEvent::Code(code))),
                None => Err(HardwareError::disconnected("mock scanner handle dropped")),
            },
        }
    }

    async fn flush(&self) -> Result<()> {
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(HardwareError::communication("simulated scanner drain failure"));
        }
        let mut codes = self.codes.lock().await;
        while codes.try_recv().is_ok() {}
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Handle for feeding a [`MockScanner`].
#[derive(Debug, Clone)]
pub struct MockScannerHandle {
    tx: mpsc::UnboundedSender<String>,
    flushes: Arc<AtomicUsize>,
    fail_flush: Arc<AtomicBool>,
}

impl MockScannerHandle {
    /// Queue one scanned code. Ignored once the scanner is gone.
    pub fn scan(&self, code: impl Into<String>) {
        let _ = self.tx.send(code.into());
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Make subsequent flushes fail.
    pub fn fail_flushes(&self, fail: bool) {
        self.fail_flush.store(fail, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scans_are_read_in_order() {
        let (scanner, handle) = MockScanner::new();
        scanner.open().await.unwrap();
        let cancel = CancellationToken::new();

        handle.scan("FIRST");
        handle.scan("SECOND");
        assert_eq!(
            scanner.read(&cancel).await.unwrap(),
            Some(PortEvent::Code("FIRST".into()))
        );
        assert_eq!(
            scanner.read(&cancel).await.unwrap(),
            Some(PortEvent::Code("SECOND".into()))
        );
    }

    #[tokio::test]
    async fn test_read_returns_on_cancel() {
        let (scanner, _handle) = MockScanner::new();
        let scanner = scanner.with_read_timeout(Duration::from_secs(60));
        scanner.open().await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(scanner.read(&cancel).await.unwrap(), None);
    }
}
