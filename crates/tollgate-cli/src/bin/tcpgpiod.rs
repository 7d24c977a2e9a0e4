//! Standalone TCPGPIO lock service.

use std::net::SocketAddr;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tollgate_cli::LogFormat;
use tollgate_cli::cli::LockServiceArgs;
use tollgate_cli::logging::init_logging;
use tollgate_cli::shutdown::shutdown_signal;
use tollgate_core::constants::{EXIT_ERROR, EXIT_OK};
use tollgate_hardware::gpio::{GpioChip, GpioRegistry, SimulatedGpio, SysfsGpio};
use tollgate_hardware::registry::HardwareRegistry;
use tollgate_network::{LockService, LockServiceConfig};

fn gpio_chip(args: &LockServiceArgs) -> GpioChip {
    if args.debug && !args.gpio_root.join("export").exists() {
        warn!(root = %args.gpio_root.display(), "sysfs GPIO not available, using simulated pins");
        return GpioChip::new(SimulatedGpio::new());
    }
    GpioChip::new(SysfsGpio::new(&args.gpio_root))
}

async fn serve(args: LockServiceArgs) -> anyhow::Result<()> {
    let chip = gpio_chip(&args);
    let registry: GpioRegistry = HardwareRegistry::new(chip.clone());

    // Hold the GPIO subsystem for the lifetime of the service
    let id = registry.allocate_id();
    registry.register(id).context("GPIO initialization failed")?;

    let config = LockServiceConfig {
        bind_addr: SocketAddr::new(args.ip, args.port),
        ..LockServiceConfig::default()
    };

    let result = async {
        let service = LockService::bind(config, chip).await?;

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            match shutdown_signal().await {
                Ok(name) => info!(signal = name, "Shutdown requested"),
                Err(e) => warn!(error = %e, "Failed to install signal handlers"),
            }
            on_signal.cancel();
        });

        service.run(cancel).await?;
        anyhow::Ok(())
    }
    .await;

    if let Err(e) = registry.unregister(id) {
        warn!(error = %e, "GPIO cleanup failed");
    }
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = LockServiceArgs::parse();

    let level = if args.debug { "debug" } else { "info" };
    if let Err(e) = init_logging(level, LogFormat::Text) {
        eprintln!("tcpgpiod: cannot initialize logging: {e}");
        return ExitCode::from(EXIT_ERROR);
    }

    info!(version = tollgate_core::VERSION, "Starting tcpgpiod");
    match serve(args).await {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(e) => {
            error!(error = %format!("{e:#}"), "Lock service failed");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
