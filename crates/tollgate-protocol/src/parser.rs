//! TCPGPIO message parser.
//!
//! This module converts raw ASCII text into structured [`Message`] objects.
//!
//! # Protocol Format
//!
//! ```text
//! DEVICE_ID:TYPE:PIN:VALUE
//! ```
//!
//! Where:
//! - `DEVICE_ID`: Sender identifier, any text without `:`
//! - `TYPE`: `0` (write), `2` (reply) or `4` (exclusive write)
//! - `PIN`: Physical board pin from the GPIO whitelist
//! - `VALUE`: `0` (low), `1` (high) or `2` (none)
//!
//! Surrounding ASCII whitespace is ignored, so a line typed into `netcat`
//! with a trailing newline parses the same as the bare message.
//!
//! # Examples
//!
//! ```
//! use tollgate_protocol::parser::MessageParser;
//! use tollgate_protocol::MessageType;
//!
//! let msg = MessageParser::parse("dev1:4:18:1").unwrap();
//! assert_eq!(msg.message_type(), MessageType::ExclusiveWrite);
//!
//! // Pin 99 is not a GPIO pin
//! assert!(MessageParser::parse("dev1:4:99:1").is_err());
//!
//! // Wrong field count
//! assert!(MessageParser::parse("dev1:4:18").is_err());
//! ```

use tollgate_core::constants::{FIELD_SEPARATOR, MESSAGE_FIELD_COUNT};
use tollgate_core::{Error, Pin, PinValue, Result};

use crate::message::{Message, MessageType};

/// Stateless parser for TCPGPIO messages.
pub struct MessageParser;

impl MessageParser {
    /// Parse a complete message.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidMessageFormat` unless exactly four fields are present
    /// - `Error::InvalidMessageType` if the type is not 0, 2 or 4
    /// - `Error::InvalidPin` if the pin is not whitelisted
    /// - `Error::InvalidPinValue` if the value is not 0, 1 or 2
    pub fn parse(input: &str) -> Result<Message> {
        let input = input.trim();
        let fields: Vec<&str> = input.split(FIELD_SEPARATOR).collect();

        if fields.len() != MESSAGE_FIELD_COUNT {
            return Err(Error::InvalidMessageFormat(format!(
                "expected {MESSAGE_FIELD_COUNT} fields, got {}",
                fields.len()
            )));
        }

        let message_type = Self::parse_type(fields[1])?;
        let pin: Pin = fields[2].parse()?;
        let value = Self::parse_value(fields[3])?;

        Message::new(fields[0], message_type, pin, value)
    }

    fn parse_type(field: &str) -> Result<MessageType> {
        let code: u8 = field
            .trim()
            .parse()
            .map_err(|_| Error::InvalidMessageType(field.to_string()))?;
        MessageType::from_code(code)
    }

    fn parse_value(field: &str) -> Result<PinValue> {
        let code: u8 = field
            .trim()
            .parse()
            .map_err(|_| Error::InvalidPinValue(field.to_string()))?;
        PinValue::from_code(code)
    }
}
