//! Payload types exchanged with ports.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{HardwareError, Result};

/// What a successful read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    /// A bare trigger such as a button press.
    Trigger,
    /// A decoded code, e.g. from a barcode scanner.
    Code(String),
}

/// Relay activation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Print,
    Scan,
}

impl Activation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Print => "print",
            Activation::Scan => "scan",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Activation {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "print" => Ok(Activation::Print),
            "scan" => Ok(Activation::Scan),
            other => Err(HardwareError::invalid_data(format!(
                "unknown relay activation: {other}"
            ))),
        }
    }
}

/// Printable projection of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSlip {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub title: Option<String>,
}

impl TicketSlip {
    /// Render the slip as text lines no wider than `width` characters.
    ///
    /// The code is wrapped in `*` (CODE39 start/stop characters).
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use tollgate_hardware::TicketSlip;
    ///
    /// let slip = TicketSlip {
    ///     code: "0A1B2C3D4E5F".into(),
    ///     issued_at: Utc.with_ymd_and_hms(2026, 10, 21, 8, 0, 0).unwrap(),
    ///     valid_until: Utc.with_ymd_and_hms(2026, 10, 21, 10, 0, 0).unwrap(),
    ///     title: Some("Parking".into()),
    /// };
    ///
    /// let lines = slip.render(32);
    /// assert_eq!(lines[0], "Parking");
    /// assert_eq!(lines.last().unwrap(), "*0A1B2C3D4E5F*");
    /// ```
    pub fn render(&self, width: usize) -> Vec<String> {
        let format = "%d.%m.%Y %H:%M";
        let issued = self.issued_at.with_timezone(&Local).format(format);
        let until = self.valid_until.with_timezone(&Local).format(format);

        let mut lines = Vec::new();
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            lines.push(truncate(title, width));
        }
        lines.push(truncate(&format!("Issued:      {issued}"), width));
        lines.push(truncate(&format!("Valid until: {until}"), width));
        lines.push(String::new());
        lines.push(format!("*{}*", self.code));
        lines
    }
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Data passed to [`Port::write`](crate::Port::write).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortData {
    /// Pulse a relay.
    Activate(Activation),
    /// Print a ticket.
    Ticket(TicketSlip),
}

/// Relay timing shared by every relay variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayTiming {
    /// Wait before a print activation; `None` disables print activations.
    pub print_delay: Option<Duration>,
    /// Wait before a scan activation; `None` disables scan activations.
    pub scan_delay: Option<Duration>,
    /// How long the relay stays engaged.
    pub period: Duration,
}

impl RelayTiming {
    /// Build from configuration seconds. A negative delay disables that mode.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use tollgate_hardware::{Activation, RelayTiming};
    ///
    /// let timing = RelayTiming::from_secs(0.5, -1.0, 3.0);
    /// assert_eq!(timing.delay_for(Activation::Print), Some(Duration::from_millis(500)));
    /// assert_eq!(timing.delay_for(Activation::Scan), None);
    /// ```
    pub fn from_secs(print_delay: f64, scan_delay: f64, period: f64) -> Self {
        let delay = |secs: f64| (secs >= 0.0).then(|| Duration::from_secs_f64(secs));
        Self {
            print_delay: delay(print_delay),
            scan_delay: delay(scan_delay),
            period: Duration::from_secs_f64(period.max(0.0)),
        }
    }

    pub fn delay_for(&self, activation: Activation) -> Option<Duration> {
        match activation {
            Activation::Print => self.print_delay,
            Activation::Scan => self.scan_delay,
        }
    }
}

impl Default for RelayTiming {
    fn default() -> Self {
        Self {
            print_delay: Some(Duration::ZERO),
            scan_delay: Some(Duration::ZERO),
            period: Duration::from_secs(1),
        }
    }
}

/// Open/closed flag shared by port implementations.
#[derive(Debug, Default)]
pub(crate) struct OpenFlag(AtomicBool);

impl OpenFlag {
    pub(crate) fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag and return the previous value.
    pub(crate) fn set(&self, open: bool) -> bool {
        self.0.swap(open, Ordering::AcqRel)
    }
}
