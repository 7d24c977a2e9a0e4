use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Protocol errors
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    #[error("Invalid message type: {0}")]
    InvalidMessageType(String),

    #[error("Invalid pin: {0}")]
    InvalidPin(String),

    #[error("Invalid pin value: {0}")]
    InvalidPinValue(String),

    #[error("Invalid encoding: message is not valid UTF-8")]
    InvalidEncoding,

    // Identity errors
    #[error("Invalid device ID: {0}")]
    InvalidDeviceId(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),
}

impl Error {
    /// True for errors raised while decoding a TCPGPIO message.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::InvalidMessageFormat(_)
                | Error::InvalidMessageType(_)
                | Error::InvalidPin(_)
                | Error::InvalidPinValue(_)
                | Error::InvalidEncoding
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
