//! Ticket printers.

use serialport::SerialPort;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use tollgate_core::Role;

use super::expect_ticket;
use crate::error::{HardwareError, Result};
use crate::traits::Port;
use crate::types::{OpenFlag, PortData, TicketSlip};

/// Default slip width in characters.
pub const DEFAULT_PRINT_WIDTH: usize = 32;

/// Default output file of [`FilePrinter`].
pub const DEFAULT_PRINT_FILE: &str = "/tmp/tollgate_ticket.txt";

/// Default baud rate of [`SerialPrinter`].
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Printer that logs each slip line.
#[derive(Debug, Default)]
pub struct LogPrinter {
    open: OpenFlag,
}

impl LogPrinter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Port for LogPrinter {
    fn role(&self) -> Role {
        Role::Printer
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
        let slip = expect_ticket(&self.name(), data)?;
        info!(code = %slip.code, "Printing ticket");
        for line in slip.render(DEFAULT_PRINT_WIDTH) {
            info!("| {line}");
        }
        Ok(())
    }
}

/// Printer that replaces a text file with the rendered slip.
#[derive(Debug)]
pub struct FilePrinter {
    path: PathBuf,
    width: usize,
    open: OpenFlag,
}

impl FilePrinter {
    pub fn new(path: impl Into<PathBuf>, width: usize) -> Self {
        Self {
            path: path.into(),
            width,
            open: OpenFlag::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl Port for FilePrinter {
    fn role(&self) -> Role {
        Role::Printer
    }

    fn variant(&self) -> &'static str {
        "file"
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
        let dir = self.directory();
        let metadata = tokio::fs::metadata(dir).await.map_err(|e| {
            HardwareError::port_test(self.name(), format!("{}: {e}", dir.display()))
        })?;

        if !metadata.is_dir() {
            return Err(HardwareError::port_test(
                self.name(),
                format!("{} is not a directory", dir.display()),
            ));
        }
        if metadata.permissions().readonly() {
            return Err(HardwareError::port_test(
                self.name(),
                format!("{} is not writable", dir.display()),
            ));
        }
        Ok(())
    }

    async fn write(&self, data: &PortData) -> Result<()> {
        let slip = expect_ticket(&self.name(), data)?;

        let mut text = slip.render(self.width).join("\n");
        text.push('\n');
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| HardwareError::port_write(self.name(), e.to_string()))?;

        debug!(code = %slip.code, path = %self.path.display(), "Ticket written");
        Ok(())
    }
}

const ESC: u8 = 0x1b;
const GS: u8 = 0x1d;

/// ESC/POS job for one slip: text, CODE39 barcode, feed and cut.
pub fn escpos_job(slip: &TicketSlip, width: usize) -> Vec<u8> {
    let mut job = vec![ESC, b'@'];

    let mut lines = slip.render(width);
    // Last line is the human readable code; the barcode prints it below
    lines.pop();
    for line in lines {
        job.extend(line.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' }));
        job.push(b'\n');
    }

    // Centered CODE39 with the text below
    job.extend([ESC, b'a', 1]);
    job.extend([GS, b'h', 80, GS, b'w', 2, GS, b'H', 2]);
    job.extend([GS, b'k', 4]);
    job.extend(slip.code.bytes());
    job.push(0);
    job.extend([ESC, b'a', 0]);

    job.extend([ESC, b'd', 4]);
    job.extend([GS, b'V', 1]);
    job
}

type SerialHandle = Arc<Mutex<Option<Box<dyn SerialPort>>>>;

/// ESC/POS printer on a serial line.
pub struct SerialPrinter {
    device: String,
    baud_rate: u32,
    width: usize,
    port: SerialHandle,
}

impl SerialPrinter {
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            width: DEFAULT_PRINT_WIDTH,
            port: Arc::new(Mutex::new(None)),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn connect(&self) -> Result<Box<dyn SerialPort>> {
        serialport::new(&self.device, self.baud_rate)
            .timeout(Duration::from_secs(1))
            .open()
            .map_err(|e| HardwareError::communication(format!("{}: {e}", self.device)))
    }
}

impl fmt::Debug for SerialPrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPrinter")
            .field("device", &self.device)
            .field("baud_rate", &self.baud_rate)
            .field("width", &self.width)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Port for SerialPrinter {
    fn role(&self) -> Role {
        Role::Printer
    }

    fn variant(&self) -> &'static str {
        "serial"
    }

    async fn open(&self) -> Result<()> {
        let mut port = self.port.lock().unwrap_or_else(PoisonError::into_inner);
        if port.is_none() {
            *port = Some(self.connect()?);
            debug!(device = %self.device, baud = self.baud_rate, "Serial printer opened");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.port
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn test(&self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        self.connect()
            .map(drop)
            .map_err(|e| HardwareError::port_test(self.name(), e.to_string()))
    }

    async fn write(&self, data: &PortData) -> Result<()> {
        let name = self.name();
        let slip = expect_ticket(&name, data)?;
        let job = escpos_job(slip, self.width);
        let port = Arc::clone(&self.port);

        let written = tokio::task::spawn_blocking(move || -> std::io::Result<bool> {
            let mut guard = port.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(serial) = guard.as_mut() else {
                return Ok(false);
            };
            serial.write_all(&job)?;
            serial.flush()?;
            Ok(true)
        })
        .await
        .map_err(|e| HardwareError::other(format!("printer task failed: {e}")))?;

        match written {
            Ok(true) => {
                debug!(code = %slip.code, device = %self.device, "Ticket printed");
                Ok(())
            }
            Ok(false) => Err(HardwareError::disconnected(name)),
            Err(e) => Err(HardwareError::port_write(name, e.to_string())),
        }
    }
}
