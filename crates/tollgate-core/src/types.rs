use crate::{
    Result,
    constants::{FIELD_SEPARATOR, GPIO_PINS, MAX_DEVICE_ID_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal device identifier (1-16 characters, no `:`).
///
/// The identifier doubles as the TCPGPIO sender id, so it must not contain
/// the protocol field separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new device ID with validation.
    ///
    /// The identifier is trimmed before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidDeviceId` if the ID is empty, longer than
    /// 16 characters or contains `:`.
    pub fn new(id: impl AsRef<str>) -> Result<Self> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(Error::InvalidDeviceId("device ID is empty".to_string()));
        }
        if id.chars().count() > MAX_DEVICE_ID_LENGTH {
            return Err(Error::InvalidDeviceId(format!(
                "device ID must be at most {MAX_DEVICE_ID_LENGTH} chars, got {id}"
            )));
        }
        if id.contains(FIELD_SEPARATOR) {
            return Err(Error::InvalidDeviceId(format!(
                "device ID must not contain '{FIELD_SEPARATOR}', got {id}"
            )));
        }
        Ok(DeviceId(id.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DeviceId::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DeviceId::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// Physical board pin restricted to [`GPIO_PINS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Pin(u8);

impl Pin {
    /// Create a new pin with whitelist validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidPin` if the pin is not a general purpose pin.
    pub fn new(pin: u8) -> Result<Self> {
        if !GPIO_PINS.contains(&pin) {
            return Err(Error::InvalidPin(format!("pin {pin} is not a GPIO pin")));
        }
        Ok(Pin(pin))
    }

    #[must_use]
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Iterate over every valid pin.
    pub fn all() -> impl Iterator<Item = Pin> {
        GPIO_PINS.iter().map(|&p| Pin(p))
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Pin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let pin: u8 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidPin(format!("not a pin number: {s}")))?;
        Pin::new(pin)
    }
}

impl TryFrom<u8> for Pin {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Pin::new(value)
    }
}

impl From<Pin> for u8 {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

/// Logical level carried by a TCPGPIO message.
///
/// `Unset` is the wire value `2` (NONE) and is used in replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinValue {
    Low,
    High,
    Unset,
}

impl PinValue {
    /// Wire code of this value.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            PinValue::Low => 0,
            PinValue::High => 1,
            PinValue::Unset => 2,
        }
    }

    /// Decode a wire code.
    ///
    /// # Errors
    /// Returns `Error::InvalidPinValue` for codes other than 0, 1 and 2.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(PinValue::Low),
            1 => Ok(PinValue::High),
            2 => Ok(PinValue::Unset),
            other => Err(Error::InvalidPinValue(other.to_string())),
        }
    }

    /// The opposite logical level, if this value has one.
    #[must_use]
    pub fn opposite(&self) -> Option<PinValue> {
        match self {
            PinValue::Low => Some(PinValue::High),
            PinValue::High => Some(PinValue::Low),
            PinValue::Unset => None,
        }
    }

    /// True if `other` is the logical opposite of `self`.
    #[must_use]
    pub fn is_opposite_of(&self, other: PinValue) -> bool {
        self.opposite() == Some(other)
    }
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            PinValue::Low => "LOW",
            PinValue::High => "HIGH",
            PinValue::Unset => "NONE",
        };
        f.write_str(s)
    }
}

/// Role a port plays in the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Button,
    Relay,
    Printer,
    Scanner,
}

impl Role {
    /// All roles in configuration order.
    pub const ALL: [Role; 4] = [Role::Button, Role::Relay, Role::Printer, Role::Scanner];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Button => "button",
            Role::Relay => "relay",
            Role::Printer => "printer",
            Role::Scanner => "scanner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "button" => Ok(Role::Button),
            "relay" => Ok(Role::Relay),
            "printer" => Ok(Role::Printer),
            "scanner" => Ok(Role::Scanner),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

/// Operating mode of a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Issue tickets on button press.
    Print,
    /// Validate scanned tickets.
    Scan,
    /// Issue and validate on the same terminal.
    Both,
}

impl Mode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Print => "print",
            Mode::Scan => "scan",
            Mode::Both => "both",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "print" => Ok(Mode::Print),
            "scan" => Ok(Mode::Scan),
            "both" => Ok(Mode::Both),
            other => Err(Error::Config(format!("unknown mode: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("gate1", "gate1")]
    #[case("  exit-2 ", "exit-2")]
    #[case("abcdefghijklmnop", "abcdefghijklmnop")]
    fn test_device_id_valid(#[case] input: &str, #[case] expected: &str) {
        let id = DeviceId::new(input).unwrap();
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("abcdefghijklmnopq")] // 17 chars
    #[case("gate:1")]
    fn test_device_id_invalid(#[case] input: &str) {
        assert!(matches!(
            DeviceId::new(input),
            Err(Error::InvalidDeviceId(_))
        ));
    }

    #[rstest]
    #[case(3)]
    #[case(18)]
    #[case(26)]
    fn test_pin_valid(#[case] pin: u8) {
        assert_eq!(Pin::new(pin).unwrap().number(), pin);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    #[case(4)]
    #[case(27)]
    #[case(99)]
    fn test_pin_invalid(#[case] pin: u8) {
        assert!(matches!(Pin::new(pin), Err(Error::InvalidPin(_))));
    }

    #[test]
    fn test_pin_from_str() {
        assert_eq!("18".parse::<Pin>().unwrap().number(), 18);
        assert!("x".parse::<Pin>().is_err());
        assert_eq!(Pin::all().count(), 17);
    }

    #[rstest]
    #[case(PinValue::Low, Some(PinValue::High))]
    #[case(PinValue::High, Some(PinValue::Low))]
    #[case(PinValue::Unset, None)]
    fn test_pin_value_opposite(#[case] value: PinValue, #[case] expected: Option<PinValue>) {
        assert_eq!(value.opposite(), expected);
    }

    #[test]
    fn test_pin_value_codes() {
        for value in [PinValue::Low, PinValue::High, PinValue::Unset] {
            assert_eq!(PinValue::from_code(value.code()).unwrap(), value);
        }
        assert!(PinValue::from_code(3).is_err());
    }

    #[test]
    fn test_unset_is_never_opposite() {
        assert!(!PinValue::Unset.is_opposite_of(PinValue::Unset));
        assert!(!PinValue::High.is_opposite_of(PinValue::Unset));
        assert!(PinValue::High.is_opposite_of(PinValue::Low));
    }

    #[test]
    fn test_role_and_mode_parse() {
        assert_eq!("Relay".parse::<Role>().unwrap(), Role::Relay);
        assert!("door".parse::<Role>().is_err());
        assert_eq!("BOTH".parse::<Mode>().unwrap(), Mode::Both);
        assert!("auto".parse::<Mode>().is_err());
        assert_eq!(Mode::Scan.to_string(), "scan");
    }
}
