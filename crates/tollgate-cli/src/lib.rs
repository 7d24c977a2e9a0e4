//! Plumbing shared by the `tollgate` and `tcpgpiod` binaries: arguments,
//! configuration, logging and signal handling.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat};
