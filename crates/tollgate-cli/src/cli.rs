//! Command-line arguments of the two binaries.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tollgate_core::constants::{TCPGPIO_DEFAULT_BIND, TCPGPIO_DEFAULT_PORT};
use tollgate_hardware::gpio::DEFAULT_SYSFS_ROOT;

/// Entrance gate ticket terminal
///
/// Issues tickets on button press and admits scanned tickets, depending on
/// the ports this device has.
#[derive(Parser, Debug)]
#[command(name = "tollgate", version = tollgate_core::VERSION, long_about = None)]
pub struct TerminalArgs {
    /// Configuration file (default: first of /etc/tollgate/tollgate.toml,
    /// /etc/tollgate.toml, ./tollgate.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Device identifier, overrides the configuration
    #[arg(short, long)]
    pub device_id: Option<String>,

    /// Operating mode (auto, print, scan, both)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Raise the log level (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// TCPGPIO lock service
///
/// Drives GPIO pins on behalf of remote relays, honouring per-pin locks.
#[derive(Parser, Debug)]
#[command(name = "tcpgpiod", version = tollgate_core::VERSION, long_about = None)]
pub struct LockServiceArgs {
    /// Address to listen on
    #[arg(short, long, default_value = TCPGPIO_DEFAULT_BIND)]
    pub ip: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = TCPGPIO_DEFAULT_PORT)]
    pub port: u16,

    /// Debug logging; falls back to simulated GPIO when sysfs is missing
    #[arg(short, long)]
    pub debug: bool,

    /// sysfs GPIO directory
    #[arg(long, default_value = DEFAULT_SYSFS_ROOT)]
    pub gpio_root: PathBuf,
}
