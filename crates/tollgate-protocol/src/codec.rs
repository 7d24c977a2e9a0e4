//! Tokio codec for TCPGPIO messages.
//!
//! TCPGPIO has no framing: a peer writes one message and the receiver treats
//! whatever one read returns (up to [`TCPGPIO_BUFFER_SIZE`] bytes) as that
//! message. The codec mirrors this by consuming the whole buffer on every
//! decode call. Two messages that arrive in the same read are therefore
//! decoded together and rejected as malformed.
//!
//! # Error Handling
//!
//! A malformed message is not a stream error. The decoder yields
//! `Ok(Some(Err(Error)))` so the connection stays usable and the caller can
//! log and drop the message. Only I/O failures end the stream.
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//! use tollgate_core::{Pin, PinValue};
//! use tollgate_protocol::{Message, TcpGpioCodec};
//!
//! # async fn example() -> std::io::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:7777").await?;
//! let mut framed = Framed::new(stream, TcpGpioCodec::new());
//!
//! let pin = Pin::new(18).unwrap();
//! let msg = Message::exclusive_write("gate1", pin, PinValue::High).unwrap();
//! framed.send(msg).await?;
//!
//! if let Some(Ok(Ok(reply))) = framed.next().await {
//!     println!("Received: {reply}");
//! }
//! # Ok(())
//! # }
//! ```

use bytes::BytesMut;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use tollgate_core::constants::TCPGPIO_BUFFER_SIZE;
use tollgate_core::{Error, Result};

use crate::{Message, MessageParser};

/// Tokio codec for TCPGPIO messages.
#[derive(Debug, Clone)]
pub struct TcpGpioCodec {
    /// Maximum number of bytes treated as one message.
    max_read: usize,
}

impl TcpGpioCodec {
    /// Create a codec with the default 1024 byte read size.
    pub fn new() -> Self {
        Self {
            max_read: TCPGPIO_BUFFER_SIZE,
        }
    }

    /// Create a codec with a custom read size.
    ///
    /// # Example
    ///
    /// ```
    /// use tollgate_protocol::TcpGpioCodec;
    ///
    /// let codec = TcpGpioCodec::with_max_read(64);
    /// assert_eq!(codec.max_read(), 64);
    /// ```
    pub fn with_max_read(max_read: usize) -> Self {
        Self {
            max_read: max_read.max(1),
        }
    }

    pub fn max_read(&self) -> usize {
        self.max_read
    }
}

impl Default for TcpGpioCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TcpGpioCodec {
    type Item = Result<Message>;
    type Error = io::Error;

    /// Decode the pending bytes as one message.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Ok(Message)))` - The read held a valid message
    /// - `Ok(Some(Err(Error)))` - The read held a malformed message
    /// - `Ok(None)` - Nothing buffered
    ///
    /// # Example
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use tokio_util::codec::Decoder;
    /// use tollgate_protocol::TcpGpioCodec;
    ///
    /// let mut codec = TcpGpioCodec::new();
    /// let mut buffer = BytesMut::from(&b"dev1:0:18:1"[..]);
    ///
    /// let msg = codec.decode(&mut buffer).unwrap().unwrap().unwrap();
    /// assert_eq!(msg.to_string(), "dev1:0:18:1");
    /// assert!(buffer.is_empty());
    /// ```
    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }

        let take = src.len().min(self.max_read);
        let chunk = src.split_to(take);

        let message = match std::str::from_utf8(&chunk) {
            Ok(text) => MessageParser::parse(text),
            Err(_) => Err(Error::InvalidEncoding),
        };
        Ok(Some(message))
    }
}

impl Encoder<Message> for TcpGpioCodec {
    type Error = io::Error;

    /// Write the message text without any terminator.
    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> io::Result<()> {
        dst.extend_from_slice(item.to_string().as_bytes());
        Ok(())
    }
}
