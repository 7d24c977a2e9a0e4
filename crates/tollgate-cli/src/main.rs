use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};
use tollgate_cli::app::run_terminal;
use tollgate_cli::cli::TerminalArgs;
use tollgate_cli::config::Config;
use tollgate_cli::logging::{init_logging, raise_level};
use tollgate_core::constants::EXIT_ERROR;

#[tokio::main]
async fn main() -> ExitCode {
    let args = TerminalArgs::parse();

    let (mut config, source) = match Config::load(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("tollgate: {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if let Some(id) = args.device_id {
        config.device.id = Some(id);
    }
    if let Some(mode) = args.mode {
        config.device.mode = Some(mode);
    }

    let level = raise_level(&config.log.level, args.verbose);
    if let Err(e) = init_logging(&level, config.log.format) {
        eprintln!("tollgate: cannot initialize logging: {e}");
        return ExitCode::from(EXIT_ERROR);
    }

    info!(version = tollgate_core::VERSION, "Starting tollgate");
    match &source {
        Some(path) => debug!(path = %path.display(), "Configuration loaded"),
        None => debug!("No configuration file found, using defaults"),
    }

    let code = run_terminal(&config).await;
    info!(code, "Exiting");
    ExitCode::from(code)
}
