//! Terminal configuration: TOML file with environment variable overrides.
//!
//! Every field has a default, so the file is optional. Environment variables
//! take precedence over file values and command-line flags over both.
//!
//! ```toml
//! [device]
//! id = "gate1"
//! mode = "auto"
//!
//! [ports]
//! button = "gpio:18"
//! relay = "tcpgpio:10.0.0.2,7777,11"
//! printer = "serial:/dev/ttyUSB0,19200"
//! scanner = "socket:/run/tollgate/scanner.sock"
//!
//! [relay]
//! print_delay = 0.5
//! scan_delay = -1
//! period = 3
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tollgate_core::Role;
use tollgate_core::constants::TCPGPIO_TIMEOUT_MS;
use tollgate_hardware::RelayTiming;
use tollgate_hardware::gpio::DEFAULT_SYSFS_ROOT;

/// Files tried in order when no path is given.
pub const CONFIG_PATHS: [&str; 3] = [
    "/etc/tollgate/tollgate.toml",
    "/etc/tollgate.toml",
    "./tollgate.toml",
];

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub ports: PortsConfig,
    pub relay: RelayConfig,
    pub gpio: GpioConfig,
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

/// Identity of this terminal.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub id: Option<String>,
    /// `auto`, `print`, `scan` or `both`; unset means `auto`.
    pub mode: Option<String>,
}

/// Port values in the `variant[:arg1[,arg2...]]` grammar.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    pub button: Option<String>,
    pub relay: Option<String>,
    pub printer: Option<String>,
    pub scanner: Option<String>,
}

impl PortsConfig {
    pub fn value(&self, role: Role) -> Option<&str> {
        match role {
            Role::Button => self.button.as_deref(),
            Role::Relay => self.relay.as_deref(),
            Role::Printer => self.printer.as_deref(),
            Role::Scanner => self.scanner.as_deref(),
        }
    }
}

/// Relay timing in seconds. A negative delay disables that activation.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub print_delay: f64,
    pub scan_delay: f64,
    pub period: f64,
    /// Reply timeout of the `tcpgpio` relay.
    pub timeout: f64,
}

impl RelayConfig {
    pub fn timing(&self) -> RelayTiming {
        RelayTiming::from_secs(self.print_delay, self.scan_delay, self.period)
    }

    pub fn tcpgpio_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout)
            .unwrap_or(Duration::from_millis(TCPGPIO_TIMEOUT_MS))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            print_delay: 0.0,
            scan_delay: 0.0,
            period: 1.0,
            timeout: TCPGPIO_TIMEOUT_MS as f64 / 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioBackendKind {
    #[default]
    Sysfs,
    Simulated,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub backend: GpioBackendKind,
    pub root: PathBuf,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            backend: GpioBackendKind::default(),
            root: PathBuf::from(DEFAULT_SYSFS_ROOT),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "tollgate.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Compact,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level or filter directive (`RUST_LOG` syntax).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load `path`, or the first existing of [`CONFIG_PATHS`], then apply
    /// environment overrides.
    ///
    /// Returns the file that was read, if any.
    ///
    /// # Errors
    ///
    /// Fails when an explicit `path` cannot be read or any file is malformed.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let source = match path {
            Some(path) => Some(path.to_path_buf()),
            None => CONFIG_PATHS.iter().map(PathBuf::from).find(|p| p.is_file()),
        };

        let mut config = match &source {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok((config, source))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `TOLLGATE_*` overrides looked up through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("TOLLGATE_DEVICE_ID") {
            self.device.id = Some(val);
        }
        if let Some(val) = lookup("TOLLGATE_MODE") {
            self.device.mode = Some(val);
        }
        if let Some(val) = lookup("TOLLGATE_DATABASE") {
            self.database.path = val;
        }
        if let Some(val) = lookup("TOLLGATE_LOG") {
            self.log.level = val;
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
