//! Error types for port operations.
//!
//! Two variants carry special meaning for callers:
//!
//! - [`HardwareError::PortTest`]: a port failed its self-test and its role is
//!   treated as absent
//! - [`HardwareError::PortWrite`]: a write failed on I/O; the worker abandons
//!   the current unit of work and keeps running
//!
//! Everything else is unexpected for a worker.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during port operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Operation is not supported by this port.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from or passed to a device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Subsystem or device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Port configuration error (unknown variant, bad argument).
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Port self-test failed.
    #[error("Port test failed for {port}: {message}")]
    PortTest { port: String, message: String },

    /// Port write failed.
    #[error("Port write failed for {port}: {message}")]
    PortWrite { port: String, message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new port test error.
    pub fn port_test(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PortTest {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new port write error.
    pub fn port_write(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PortWrite {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// True if this is a recoverable write failure.
    pub fn is_port_write(&self) -> bool {
        matches!(self, Self::PortWrite { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("scanner socket");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: scanner socket");
    }

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout(5000);
        assert_eq!(error.to_string(), "Operation timeout after 5000ms");
    }

    #[test]
    fn test_port_test_error() {
        let error = HardwareError::port_test("printer file", "/nope is not writable");
        assert!(matches!(error, HardwareError::PortTest { .. }));
        assert_eq!(
            error.to_string(),
            "Port test failed for printer file: /nope is not writable"
        );
        assert!(!error.is_port_write());
    }

    #[test]
    fn test_port_write_error() {
        let error = HardwareError::port_write("relay tcpgpio", "Read timeout after 5000ms");
        assert!(error.is_port_write());
        assert_eq!(
            error.to_string(),
            "Port write failed for relay tcpgpio: Read timeout after 5000ms"
        );
    }

    #[test]
    fn test_unsupported_is_not_port_write() {
        assert!(!HardwareError::unsupported("button write").is_port_write());
        assert!(!HardwareError::from(std::io::Error::other("boom")).is_port_write());
    }
}
