//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Raise a plain level by `steps` (one per `-v`). Filter directives other
/// than a plain level are returned unchanged.
pub fn raise_level(level: &str, steps: u8) -> String {
    let level = level.trim().to_ascii_lowercase();
    match LEVELS.iter().position(|l| *l == level) {
        Some(index) => {
            let raised = (index + usize::from(steps)).min(LEVELS.len() - 1);
            LEVELS[raised].to_string()
        }
        None => level,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
///
/// # Errors
///
/// Fails if `level` is not a valid filter or a subscriber is already set.
pub fn init_logging(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };
    let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_ansi(is_terminal))
            .try_init()?,
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_ansi(is_terminal),
            )
            .try_init()?,
    }
    Ok(())
}
