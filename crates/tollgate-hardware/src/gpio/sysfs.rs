use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use tollgate_core::{Pin, PinValue};

use super::{Direction, GpioBackend, bcm_line};
use crate::error::{HardwareError, Result};

/// Default location of the kernel GPIO sysfs interface.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

const EXPORT_RETRIES: u32 = 10;
const EXPORT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// GPIO controller driven through `/sys/class/gpio`.
///
/// Board pins are mapped to BCM lines, exported on first setup and
/// unexported on release or cleanup.
#[derive(Debug)]
pub struct SysfsGpio {
    root: PathBuf,
    lines: Mutex<BTreeSet<u8>>,
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lines: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn line_dir(&self, line: u8) -> PathBuf {
        self.root.join(format!("gpio{line}"))
    }

    fn export(&self, line: u8) -> Result<()> {
        let dir = self.line_dir(line);
        if dir.exists() {
            return Ok(());
        }
        fs::write(self.root.join("export"), line.to_string())?;
        debug!(line, "GPIO line exported");
        Ok(())
    }

    fn unexport(&self, line: u8) -> Result<()> {
        fs::write(self.root.join("unexport"), line.to_string())?;
        debug!(line, "GPIO line unexported");
        Ok(())
    }

    // The attribute files appear (and get their permissions) shortly after export.
    fn write_attribute(&self, line: u8, attribute: &str, value: &str) -> Result<()> {
        let path = self.line_dir(line).join(attribute);
        let mut attempt = 0;
        loop {
            match fs::write(&path, value) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < EXPORT_RETRIES => {
                    debug!(path = %path.display(), error = %e, "GPIO attribute not ready");
                    attempt += 1;
                    thread::sleep(EXPORT_RETRY_DELAY);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn lines(&self) -> std::sync::MutexGuard<'_, BTreeSet<u8>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl GpioBackend for SysfsGpio {
    fn name(&self) -> &str {
        "sysfs-gpio"
    }

    fn initialize(&self) -> Result<()> {
        if !self.root.join("export").exists() {
            return Err(HardwareError::initialization_failed(format!(
                "GPIO sysfs interface not found at {}",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn cleanup(&self) -> Result<()> {
        let lines = std::mem::take(&mut *self.lines());
        let mut first_error = None;

        for line in lines {
            if let Err(e) = self.unexport(line) {
                warn!(line, error = %e, "Failed to unexport GPIO line");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn setup(&self, pin: Pin, direction: Direction) -> Result<()> {
        let line = bcm_line(pin);
        self.export(line)?;
        self.lines().insert(line);
        self.write_attribute(line, "direction", direction.as_str())
    }

    fn release(&self, pin: Pin) -> Result<()> {
        let line = bcm_line(pin);
        if self.lines().remove(&line) {
            self.unexport(line)?;
        }
        Ok(())
    }

    fn read(&self, pin: Pin) -> Result<PinValue> {
        let path = self.line_dir(bcm_line(pin)).join("value");
        let raw = fs::read_to_string(&path)?;
        match raw.trim() {
            "0" => Ok(PinValue::Low),
            "1" => Ok(PinValue::High),
            other => Err(HardwareError::invalid_data(format!(
                "unexpected GPIO value {other:?} in {}",
                path.display()
            ))),
        }
    }

    fn write(&self, pin: Pin, value: PinValue) -> Result<()> {
        let raw = match value {
            PinValue::Low => "0",
            PinValue::High => "1",
            PinValue::Unset => {
                return Err(HardwareError::invalid_data(format!(
                    "invalid GPIO pin value {value} for pin {pin}"
                )));
            }
        };
        self.write_attribute(bcm_line(pin), "value", raw)
    }
}
