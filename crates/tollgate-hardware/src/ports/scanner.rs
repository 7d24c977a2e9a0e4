//! Barcode scanners fed by a helper process.
//!
//! - [`SocketScanner`]: a scanner daemon (or `socat`) sends one decoded code
//!   per datagram to a unix socket.
//! - [`FifoScanner`]: codes are written to a named pipe, one per line.

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::UnixDatagram;
use tokio::net::unix::pipe;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use tollgate_core::Role;
use tollgate_core::constants::PORT_READ_TIMEOUT_MS;

use crate::error::{HardwareError, Result};
use crate::traits::Port;
use crate::types::{OpenFlag, PortEvent};

/// Default socket path of [`SocketScanner`].
pub const DEFAULT_SCANNER_SOCKET: &str = "/tmp/tollgate_scanner.sock";

const MAX_DATAGRAM: usize = 1024;
const FLUSH_WAIT: Duration = Duration::from_millis(5);

/// Fail unless the directory that will hold `path` exists.
async fn check_directory(port: &str, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match tokio::fs::metadata(dir).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(HardwareError::port_test(
            port,
            format!("{} is not a directory", dir.display()),
        )),
        Err(e) => Err(HardwareError::port_test(port, format!("{}: {e}", dir.display()))),
    }
}

fn decode(raw: &[u8]) -> Option<String> {
    let code = String::from_utf8_lossy(raw).trim().to_string();
    (!code.is_empty()).then_some(code)
}

#[derive(Debug)]
pub struct SocketScanner {
    path: PathBuf,
    read_timeout: Duration,
    socket: Mutex<Option<Arc<UnixDatagram>>>,
}

impl SocketScanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_timeout: Duration::from_millis(PORT_READ_TIMEOUT_MS),
            socket: Mutex::new(None),
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn socket(&self) -> Option<Arc<UnixDatagram>> {
        self.socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Port for SocketScanner {
    fn role(&self) -> Role {
        Role::Scanner
    }

    fn variant(&self) -> &'static str {
        "socket"
    }

    async fn open(&self) -> Result<()> {
        let mut socket = self.socket.lock().unwrap_or_else(PoisonError::into_inner);
        if socket.is_some() {
            return Ok(());
        }

        // Leftover from a previous run
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        *socket = Some(Arc::new(UnixDatagram::bind(&self.path)?));
        debug!(path = %self.path.display(), "Scanner socket bound");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let taken = self
            .socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if taken.is_some() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "Failed to remove scanner socket");
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.socket().is_some()
    }

    async fn test(&self) -> Result<()> {
        check_directory(&self.name(), &self.path).await
    }

    async fn read(&self, cancel: &CancellationToken) -> Result<Option<PortEvent>> {
        let Some(socket) = self.socket() else {
            return Err(HardwareError::disconnected(self.name()));
        };

        let mut buf = [0u8; MAX_DATAGRAM];
        tokio::select! {
            _ = cancel.cancelled() => Ok(None),
            _ = tokio::time::sleep(self.read_timeout) => Ok(None),
            received = socket.recv(&mut buf) => {
                let len = received?;
                let code = decode(&buf[..len]);
                trace!(?code, "Scanner datagram received");
                Ok(code.map(PortEvent::Code))
            }
        }
    }

    async fn flush(&self) -> Result<()> {
        let Some(socket) = self.socket() else {
            return Ok(());
        };

        let mut buf = [0u8; MAX_DATAGRAM];
        let mut dropped = 0;
        while let Ok(received) = tokio::time::timeout(FLUSH_WAIT, socket.recv(&mut buf)).await {
            if let Err(e) = received {
                warn!(port = %self.name(), error = %e, "Scanner drain failed");
                break;
            }
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Discarded queued scans");
        }
        Ok(())
    }
}

/// Default path of [`FifoScanner`].
pub const DEFAULT_SCANNER_FIFO: &str = "/tmp/tollgate_scanner.fifo";

const FIFO_CHUNK: usize = 1024;

/// Open the read end without waiting for a writer.
fn fifo_receiver(path: &Path) -> std::io::Result<pipe::Receiver> {
    let mut options = pipe::OpenOptions::new();
    // Holding a write end keeps the pipe from reporting EOF between writers
    #[cfg(target_os = "linux")]
    options.read_write(true);
    options.open_receiver(path)
}

#[derive(Debug)]
struct Fifo {
    receiver: pipe::Receiver,
    partial: Vec<u8>,
    lines: VecDeque<String>,
}

impl Fifo {
    fn feed(&mut self, chunk: &[u8]) {
        self.partial.extend_from_slice(chunk);
        while let Some(end) = self.partial.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=end).collect();
            if let Some(code) = decode(&line) {
                self.lines.push_back(code);
            }
        }
    }
}

/// Scanner reading one code per line from a named pipe it creates.
#[derive(Debug)]
pub struct FifoScanner {
    path: PathBuf,
    read_timeout: Duration,
    fifo: AsyncMutex<Option<Fifo>>,
    open: OpenFlag,
}

impl FifoScanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_timeout: Duration::from_millis(PORT_READ_TIMEOUT_MS),
            fifo: AsyncMutex::new(None),
            open: OpenFlag::default(),
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Port for FifoScanner {
    fn role(&self) -> Role {
        Role::Scanner
    }

    fn variant(&self) -> &'static str {
        "fifo"
    }

    async fn open(&self) -> Result<()> {
        let mut fifo = self.fifo.lock().await;
        if fifo.is_some() {
            return Ok(());
        }

        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        mkfifo(&self.path, Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IWGRP)
            .map_err(std::io::Error::from)?;

        let receiver = match fifo_receiver(&self.path) {
            Ok(receiver) => receiver,
            Err(e) => {
                let _ = std::fs::remove_file(&self.path);
                return Err(e.into());
            }
        };
        *fifo = Some(Fifo {
            receiver,
            partial: Vec::new(),
            lines: VecDeque::new(),
        });
        self.open.set(true);
        debug!(path = %self.path.display(), "Scanner fifo created");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let taken = self.fifo.lock().await.take();
        self.open.set(false);
        if taken.is_some()
            && let Err(e) = std::fs::remove_file(&self.path)
        {
            warn!(path = %self.path.display(), error = %e, "Failed to remove scanner fifo");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.get()
    }

    async fn test(&self) -> Result<()> {
        check_directory(&self.name(), &self.path).await
    }

    async fn read(&self, cancel: &CancellationToken) -> Result<Option<PortEvent>> {
        let mut guard = self.fifo.lock().await;
        let Some(fifo) = guard.as_mut() else {
            return Err(HardwareError::disconnected(self.name()));
        };

        if let Some(code) = fifo.lines.pop_front() {
            return Ok(Some(PortEvent::Code(code)));
        }

        let mut buf = [0u8; FIFO_CHUNK];
        let received = tokio::select! {
            _ = cancel.cancelled() => None,
            _ = tokio::time::sleep(self.read_timeout) => None,
            received = fifo.receiver.read(&mut buf) => Some(received?),
        };

        match received {
            None => Ok(None),
            Some(0) => {
                // Last writer went away
                fifo.receiver = fifo_receiver(&self.path)?;
                Ok(None)
            }
            Some(len) => {
                fifo.feed(&buf[..len]);
                let code = fifo.lines.pop_front();
                trace!(?code, "Scanner line received");
                Ok(code.map(PortEvent::Code))
            }
        }
    }

    async fn flush(&self) -> Result<()> {
        let mut guard = self.fifo.lock().await;
        let Some(fifo) = guard.as_mut() else {
            return Ok(());
        };

        let mut dropped = fifo.lines.len();
        fifo.lines.clear();
        fifo.partial.clear();

        let mut buf = [0u8; FIFO_CHUNK];
        while let Ok(received) = tokio::time::timeout(FLUSH_WAIT, fifo.receiver.read(&mut buf)).await
        {
            match received {
                Ok(0) => break,
                Ok(_) => dropped += 1,
                Err(e) => {
                    warn!(port = %self.name(), error = %e, "Scanner drain failed");
                    break;
                }
            }
        }
        if dropped > 0 {
            debug!(dropped, "Discarded queued scans");
        }
        Ok(())
    }
}
