//! Terminal startup sequence.

use std::sync::Arc;
use tracing::{error, info};
use tollgate_core::DeviceId;
use tollgate_core::Role;
use tollgate_core::constants::{EXIT_CRITICAL, EXIT_ERROR, EXIT_RESOLUTION_FAILED};
use tollgate_hardware::factory::{PortFactory, PortSettings};
use tollgate_hardware::gpio::{GpioChip, GpioRegistry, SimulatedGpio, SysfsGpio};
use tollgate_hardware::registry::HardwareRegistry;
use tollgate_storage::{Database, DatabaseConfig};
use tollgate_terminal::{ExitSignal, RequestedMode, Supervisor, bootstrap};

use crate::config::{Config, GpioBackendKind};
use crate::shutdown::spawn_signal_listener;

/// GPIO registry for the configured backend.
pub fn gpio_registry(config: &Config) -> Arc<GpioRegistry> {
    let chip = match config.gpio.backend {
        GpioBackendKind::Sysfs => GpioChip::new(SysfsGpio::new(&config.gpio.root)),
        GpioBackendKind::Simulated => GpioChip::new(SimulatedGpio::new()),
    };
    Arc::new(HardwareRegistry::new(chip))
}

/// Run the terminal and return the process exit code.
pub async fn run_terminal(config: &Config) -> u8 {
    let device = match config.device.id.as_deref().map(DeviceId::new).transpose() {
        Ok(device) => device,
        Err(e) => {
            error!(error = %e, "Invalid device id");
            return EXIT_RESOLUTION_FAILED;
        }
    };
    let requested = RequestedMode::from_config(config.device.mode.as_deref());

    let db = match Database::new(DatabaseConfig::new(&config.database.path)).await {
        Ok(db) => db,
        Err(e) => {
            error!(path = %config.database.path, error = %e, "Cannot open database");
            return EXIT_ERROR;
        }
    };

    let settings = PortSettings {
        device_id: device.clone(),
        relay: config.relay.timing(),
        tcpgpio_timeout: config.relay.tcpgpio_timeout(),
        ..PortSettings::default()
    };
    let factory = PortFactory::new(gpio_registry(config), settings);
    let ports = factory
        .create_all(Role::ALL.map(|role| (role, config.ports.value(role))))
        .await;

    let terminal = match bootstrap(device, requested, ports, db.clone()).await {
        Ok(terminal) => terminal,
        Err(e) => {
            error!(error = %e, "Device resolution failed");
            db.close().await;
            return EXIT_RESOLUTION_FAILED;
        }
    };
    info!(device_id = %terminal.device, mode = %terminal.mode, "Terminal starting");

    let exit = ExitSignal::new();
    let signals = spawn_signal_listener(exit.clone());

    let code = match Supervisor::new(terminal.clone(), exit.clone()) {
        Ok(supervisor) => supervisor.run().await.exit_code(),
        Err(e) => {
            error!(error = %e, "Cannot start workers");
            terminal.ports.close_all().await;
            db.close().await;
            EXIT_CRITICAL
        }
    };

    signals.abort();
    code
}
