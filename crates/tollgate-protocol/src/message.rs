use serde::{Deserialize, Serialize};
use std::fmt;
use tollgate_core::constants::FIELD_SEPARATOR;
use tollgate_core::{Error, Pin, PinValue, Result};

use crate::parser::MessageParser;

/// Kind of TCPGPIO request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Drive the pin without touching its lock (`0`).
    Write,
    /// Acknowledgement sent back by the lock service (`2`).
    Reply,
    /// Drive the pin and acquire or release its lock (`4`).
    ExclusiveWrite,
}

impl MessageType {
    /// Wire code of this type.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            MessageType::Write => 0,
            MessageType::Reply => 2,
            MessageType::ExclusiveWrite => 4,
        }
    }

    /// Decode a wire code.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageType` for codes other than 0, 2 and 4.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(MessageType::Write),
            2 => Ok(MessageType::Reply),
            4 => Ok(MessageType::ExclusiveWrite),
            other => Err(Error::InvalidMessageType(other.to_string())),
        }
    }
}

/// A single TCPGPIO message.
///
/// Serialized as `<device_id>:<type>:<pin>:<value>`. Fields are private so a
/// message cannot change after construction.
///
/// # Examples
///
/// ```
/// use tollgate_core::{Pin, PinValue};
/// use tollgate_protocol::{Message, MessageType};
///
/// let msg: Message = "dev1:4:18:1".parse().unwrap();
/// assert_eq!(msg.device_id(), "dev1");
/// assert_eq!(msg.message_type(), MessageType::ExclusiveWrite);
/// assert_eq!(msg.pin(), Pin::new(18).unwrap());
/// assert_eq!(msg.value(), PinValue::High);
/// assert_eq!(msg.to_string(), "dev1:4:18:1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    device_id: String,
    message_type: MessageType,
    pin: Pin,
    value: PinValue,
}

impl Message {
    /// Create a new message.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` if the device id contains the
    /// field separator, since such a message could not be parsed back.
    pub fn new(
        device_id: impl Into<String>,
        message_type: MessageType,
        pin: Pin,
        value: PinValue,
    ) -> Result<Self> {
        let device_id = device_id.into();
        if device_id.contains(FIELD_SEPARATOR) {
            return Err(Error::InvalidMessageFormat(format!(
                "device id must not contain '{FIELD_SEPARATOR}': {device_id}"
            )));
        }
        Ok(Message {
            device_id,
            message_type,
            pin,
            value,
        })
    }

    /// Shorthand for an exclusive write.
    ///
    /// # Errors
    /// Same as [`Message::new`].
    pub fn exclusive_write(device_id: impl Into<String>, pin: Pin, value: PinValue) -> Result<Self> {
        Message::new(device_id, MessageType::ExclusiveWrite, pin, value)
    }

    /// The reply the lock service sends for `self`.
    ///
    /// Keeps the sender's id and pin; the value is always NONE.
    #[must_use]
    pub fn reply(&self) -> Message {
        Message {
            device_id: self.device_id.clone(),
            message_type: MessageType::Reply,
            pin: self.pin,
            value: PinValue::Unset,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    pub fn value(&self) -> PinValue {
        self.value
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.device_id,
            self.message_type.code(),
            self.pin.number(),
            self.value.code(),
            sep = FIELD_SEPARATOR
        )
    }
}

impl std::str::FromStr for Message {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MessageParser::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(n: u8) -> Pin {
        Pin::new(n).unwrap()
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::new("gate1", MessageType::Write, pin(11), PinValue::Low).unwrap();
        assert_eq!(msg.device_id(), "gate1");
        assert_eq!(msg.message_type(), MessageType::Write);
        assert_eq!(msg.pin().number(), 11);
        assert_eq!(msg.value(), PinValue::Low);
    }

    #[test]
    fn test_message_rejects_separator_in_device_id() {
        let result = Message::new("ga:te", MessageType::Write, pin(11), PinValue::Low);
        assert!(matches!(result, Err(Error::InvalidMessageFormat(_))));
    }

    #[test]
    fn test_message_display() {
        let msg = Message::exclusive_write("dev1", pin(18), PinValue::High).unwrap();
        assert_eq!(msg.to_string(), "dev1:4:18:1");
    }

    #[test]
    fn test_reply_keeps_sender_and_pin() {
        let msg = Message::exclusive_write("dev3", pin(18), PinValue::Low).unwrap();
        let reply = msg.reply();
        assert_eq!(reply.device_id(), "dev3");
        assert_eq!(reply.message_type(), MessageType::Reply);
        assert_eq!(reply.pin(), msg.pin());
        assert_eq!(reply.value(), PinValue::Unset);
        assert_eq!(reply.to_string(), "dev3:2:18:2");
    }

    #[test]
    fn test_message_type_codes() {
        for t in [MessageType::Write, MessageType::Reply, MessageType::ExclusiveWrite] {
            assert_eq!(MessageType::from_code(t.code()).unwrap(), t);
        }
        assert!(MessageType::from_code(1).is_err());
        assert!(MessageType::from_code(3).is_err());
    }
}
