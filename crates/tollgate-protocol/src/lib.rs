//! TCPGPIO wire protocol.
//!
//! A message asks a remote lock service to drive one GPIO pin, optionally
//! acquiring or releasing an exclusive lock on it. See [`Message`] for the
//! wire format and [`TcpGpioCodec`] for the stream integration.

pub mod codec;
pub mod message;
pub mod parser;

pub use codec::TcpGpioCodec;
pub use message::{Message, MessageType};
pub use parser::MessageParser;
