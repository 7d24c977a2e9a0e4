//! Property-based tests for TCPGPIO message serialization.
//!
//! These tests generate arbitrary valid messages and check that the text
//! form is stable across a parse.

use proptest::prelude::*;
use tollgate_core::constants::GPIO_PINS;
use tollgate_core::{Pin, PinValue};
use tollgate_protocol::{Message, MessageParser, MessageType};

/// Strategy for device ids (any printable text without the separator).
fn valid_device_id() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9A-Za-z_.-]{0,16}")
        .expect("Failed to create device id regex strategy")
}

fn valid_pin() -> impl Strategy<Value = Pin> {
    prop::sample::select(GPIO_PINS.to_vec()).prop_map(|p| Pin::new(p).unwrap())
}

fn valid_type() -> impl Strategy<Value = MessageType> {
    prop_oneof![
        Just(MessageType::Write),
        Just(MessageType::Reply),
        Just(MessageType::ExclusiveWrite),
    ]
}

fn valid_value() -> impl Strategy<Value = PinValue> {
    prop_oneof![
        Just(PinValue::Low),
        Just(PinValue::High),
        Just(PinValue::Unset),
    ]
}

proptest! {
    /// Property: serialize(parse(serialize(m))) == serialize(m).
    #[test]
    fn prop_message_roundtrip(
        device_id in valid_device_id(),
        message_type in valid_type(),
        pin in valid_pin(),
        value in valid_value(),
    ) {
        let msg = Message::new(device_id, message_type, pin, value).unwrap();
        let text = msg.to_string();
        let parsed = MessageParser::parse(&text).unwrap();

        prop_assert_eq!(parsed.to_string(), text);
        prop_assert_eq!(parsed, msg);
    }

    /// Property: pins outside the whitelist never parse.
    #[test]
    fn prop_non_gpio_pin_rejected(pin in any::<u8>().prop_filter("not a GPIO pin", |p| !GPIO_PINS.contains(p))) {
        let text = format!("dev1:4:{pin}:1");
        let error = MessageParser::parse(&text).unwrap_err();
        prop_assert!(error.is_protocol());
    }

    /// Property: arbitrary text never panics the parser.
    #[test]
    fn prop_parser_total(input in ".{0,64}") {
        let _ = MessageParser::parse(&input);
    }
}
