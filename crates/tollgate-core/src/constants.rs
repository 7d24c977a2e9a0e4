//! Core constants for the tollgate terminal and the TCPGPIO protocol.
//!
//! This module centralizes the protocol-level constants, timing defaults and
//! process exit codes shared by every crate in the workspace.
//!
//! # Protocol Structure
//!
//! A TCPGPIO message is a single ASCII line of four colon-separated fields:
//!
//! ```text
//! <device_id>:<type>:<pin>:<value>
//! ```
//!
//! Where:
//! - `device_id` - Identifier of the sending terminal (free text without `:`)
//! - `type` - `0` write, `2` reply, `4` exclusive write
//! - `pin` - Physical board pin, restricted to [`GPIO_PINS`]
//! - `value` - `0` low, `1` high, `2` none
//!
//! There is no length prefix and no terminator: one read is one message.
//!
//! # Usage
//!
//! ```
//! use tollgate_core::constants::*;
//!
//! assert!(GPIO_PINS.contains(&18));
//! assert_eq!(TCPGPIO_DEFAULT_PORT, 7777);
//!
//! use std::time::Duration;
//! let timeout = Duration::from_millis(TCPGPIO_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 5);
//! ```

// ============================================================================
// TCPGPIO Protocol
// ============================================================================

/// Field separator in TCPGPIO messages.
///
/// # Examples
///
/// ```
/// use tollgate_core::constants::FIELD_SEPARATOR;
///
/// let fields: Vec<&str> = "gate1:4:18:1".split(FIELD_SEPARATOR).collect();
/// assert_eq!(fields, vec!["gate1", "4", "18", "1"]);
/// ```
pub const FIELD_SEPARATOR: char = ':';

/// Number of fields in every TCPGPIO message.
pub const MESSAGE_FIELD_COUNT: usize = 4;

/// Physical board pins that may be driven over TCPGPIO.
///
/// These are the general purpose pins of the 26-pin header; power and ground
/// pins are excluded.
pub const GPIO_PINS: [u8; 17] = [3, 5, 7, 8, 10, 11, 12, 13, 15, 16, 18, 19, 21, 22, 23, 24, 26];

/// Maximum number of bytes consumed by a single read.
///
/// One read is treated as one complete message.
pub const TCPGPIO_BUFFER_SIZE: usize = 1024;

/// Default listening port of the lock service.
pub const TCPGPIO_DEFAULT_PORT: u16 = 7777;

/// Default listening address of the lock service.
pub const TCPGPIO_DEFAULT_BIND: &str = "0.0.0.0";

/// Client-side timeout waiting for a REPLY (milliseconds).
pub const TCPGPIO_TIMEOUT_MS: u64 = 5000;

// ============================================================================
// Ports
// ============================================================================

/// Upper bound of a single port read (milliseconds).
///
/// Workers re-check the exit state between reads, so this bounds the time a
/// worker needs to notice a shutdown request.
pub const PORT_READ_TIMEOUT_MS: u64 = 1000;

/// Pin used by GPIO buttons and relays when none is configured.
pub const DEFAULT_GPIO_PIN: u8 = 18;

/// Button bounce suppression window (milliseconds).
pub const BUTTON_BOUNCE_MS: u64 = 1000;

/// Interval between two samples of a polled GPIO input (milliseconds).
pub const BUTTON_POLL_INTERVAL_MS: u64 = 10;

// ============================================================================
// Supervisor
// ============================================================================

/// Interval between two worker liveness checks (milliseconds).
pub const SUPERVISOR_INTERVAL_MS: u64 = 1000;

/// Ticket validity used when no `validity` option is stored (minutes).
pub const DEFAULT_TICKET_VALIDITY_MIN: i64 = 120;

/// Maximum length of a terminal device identifier.
pub const MAX_DEVICE_ID_LENGTH: usize = 16;

// ============================================================================
// Process Exit Codes
// ============================================================================

/// Clean shutdown after an external exit request.
pub const EXIT_OK: u8 = 0;

/// Generic critical error outside the supervisor (configuration, bind failure).
pub const EXIT_ERROR: u8 = 1;

/// Device identity or operating mode could not be resolved.
pub const EXIT_RESOLUTION_FAILED: u8 = 3;

/// A worker died or crashed and the terminal shut down critically.
pub const EXIT_CRITICAL: u8 = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_whitelist_is_sorted_and_unique() {
        assert!(GPIO_PINS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_default_pin_is_whitelisted() {
        assert!(GPIO_PINS.contains(&DEFAULT_GPIO_PIN));
    }

    #[test]
    fn test_read_timeout_is_bounded() {
        assert!((1000..=2000).contains(&PORT_READ_TIMEOUT_MS));
        assert!((1000..=2000).contains(&SUPERVISOR_INTERVAL_MS));
    }
}
