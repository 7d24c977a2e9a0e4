use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tollgate_core::Role;

use crate::error::{HardwareError, Result};
use crate::ports::expect_ticket;
use crate::traits::Port;
use crate::types::{OpenFlag, PortData, TicketSlip};

#[derive(Debug, Default)]
struct Shared {
    slips: Mutex<Vec<TicketSlip>>,
    fail: AtomicBool,
}

/// Printer that keeps every slip it was given.
#[derive(Debug)]
pub struct MockPrinter {
    shared: Arc<Shared>,
    open: OpenFlag,
}

impl MockPrinter {
    pub fn new() -> (Self, MockPrinterHandle) {
        let shared = Arc::new(Shared::default());
        let printer = Self {
            shared: Arc::clone(&shared),
            open: OpenFlag::default(),
        };
        (printer, MockPrinterHandle { shared })
    }
}

impl Port for MockPrinter {
    fn role(&self) -> Role {
        Role::Printer
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
        let slip = expect_ticket(&self.name(), data)?;
        if self.shared.fail.load(Ordering::SeqCst) {
            return Err(HardwareError::port_write(self.name(), "out of paper"));
        }
        self.shared
            .slips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(slip.clone());
        Ok(())
    }
}

/// Inspects and controls a [`MockPrinter`].
#[derive(Debug, Clone)]
pub struct MockPrinterHandle {
    shared: Arc<Shared>,
}

impl MockPrinterHandle {
    pub fn slips(&self) -> Vec<TicketSlip> {
        self.shared
            .slips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make subsequent writes fail with a port-write error.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail.store(fail, Ordering::SeqCst);
    }
}
