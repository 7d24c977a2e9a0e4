//! TCP client for TCPGPIO exchanges.
//!
//! A remote relay drives a pin on another device by sending one message and
//! waiting for the REPLY. Every exchange uses its own connection:
//!
//! ```text
//! TcpGpioRelay
//!     │
//!     └─> TcpGpioClient ───(TCP)───> LockService ───> GPIO pin
//!            │
//!            └─> TcpGpioCodec (one message per read)
//! ```
//!
//! # Timeout Handling
//!
//! Connect, send and receive are each bounded by the configured timeout
//! (default 5000ms). A lock service that ignores an exclusive write sends no
//! reply at all, so a read timeout is an expected outcome and is reported as
//! [`TcpGpioClientError::ReadTimeout`].
//!
//! # Design Principles
//!
//! - **No automatic retry**: the caller decides what a failed exchange means
//! - **No connection reuse**: one connection per exchange
//! - **No framing**: the reply is whatever the first read returns

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, error, trace, warn};
use tollgate_core::constants::{TCPGPIO_DEFAULT_PORT, TCPGPIO_TIMEOUT_MS};
use tollgate_protocol::{Message, MessageType, TcpGpioCodec};

/// Configuration for a TCPGPIO client.
#[derive(Debug, Clone)]
pub struct TcpGpioClientConfig {
    /// Address of the lock service
    pub server_addr: SocketAddr,

    /// Bound for connect, send and receive
    pub timeout: Duration,
}

impl Default for TcpGpioClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], TCPGPIO_DEFAULT_PORT)),
            timeout: Duration::from_millis(TCPGPIO_TIMEOUT_MS),
        }
    }
}

/// Errors raised by [`TcpGpioClient`].
#[derive(Debug, Error)]
pub enum TcpGpioClientError {
    #[error("Not connected to lock service")]
    NotConnected,

    #[error("Connection timeout after {0}ms")]
    ConnectionTimeout(u64),

    #[error("Read timeout after {0}ms")]
    ReadTimeout(u64),

    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] tollgate_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client side of a TCPGPIO exchange.
pub struct TcpGpioClient {
    server_addr: SocketAddr,
    framed: Option<Framed<TcpStream, TcpGpioCodec>>,
    timeout: Duration,
}

impl TcpGpioClient {
    /// Create a new client. No connection is made until [`connect`](Self::connect).
    pub fn new(config: TcpGpioClientConfig) -> Self {
        Self {
            server_addr: config.server_addr,
            framed: None,
            timeout: config.timeout,
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Connect to the lock service.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionTimeout` if the connection is not established in
    /// time, or `Io` if it is refused.
    pub async fn connect(&mut self) -> Result<(), TcpGpioClientError> {
        debug!(server = %self.server_addr, "Connecting to lock service");

        let stream =
            match tokio::time::timeout(self.timeout, TcpStream::connect(self.server_addr)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    error!(server = %self.server_addr, error = %e, "Connection failed");
                    return Err(e.into());
                }
                Err(_) => {
                    warn!(
                        server = %self.server_addr,
                        "Connection timeout after {}ms",
                        self.timeout_ms()
                    );
                    return Err(TcpGpioClientError::ConnectionTimeout(self.timeout_ms()));
                }
            };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        self.framed = Some(Framed::new(stream, TcpGpioCodec::new()));
        Ok(())
    }

    /// Send one message.
    pub async fn send(&mut self, message: Message) -> Result<(), TcpGpioClientError> {
        trace!(%message, "Sending message to lock service");

        let timeout = self.timeout;
        let timeout_ms = self.timeout_ms();
        let framed = self.framed.as_mut().ok_or(TcpGpioClientError::NotConnected)?;

        match tokio::time::timeout(timeout, framed.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Failed to send message: {}", e);
                Err(e.into())
            }
            Err(_) => {
                warn!("Send timeout after {}ms", timeout_ms);
                Err(TcpGpioClientError::WriteTimeout(timeout_ms))
            }
        }
    }

    /// Wait for one message.
    pub async fn recv(&mut self) -> Result<Message, TcpGpioClientError> {
        let timeout = self.timeout;
        let timeout_ms = self.timeout_ms();
        let framed = self.framed.as_mut().ok_or(TcpGpioClientError::NotConnected)?;

        match tokio::time::timeout(timeout, framed.next()).await {
            Ok(Some(Ok(Ok(message)))) => {
                trace!(%message, "Received message from lock service");
                Ok(message)
            }
            Ok(Some(Ok(Err(e)))) => {
                error!("Failed to decode reply: {}", e);
                Err(e.into())
            }
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(None) => {
                warn!("Connection closed by lock service");
                Err(TcpGpioClientError::ConnectionLost(
                    "Lock service closed connection".to_string(),
                ))
            }
            Err(_) => {
                debug!("No reply within {}ms", timeout_ms);
                Err(TcpGpioClientError::ReadTimeout(timeout_ms))
            }
        }
    }

    /// Connect, send `message`, wait for the reply and close.
    ///
    /// The connection is closed whether or not the exchange succeeded.
    pub async fn exchange(&mut self, message: Message) -> Result<Message, TcpGpioClientError> {
        self.connect().await?;

        let result = match self.send(message).await {
            Ok(()) => self.recv().await,
            Err(e) => Err(e),
        };
        self.close().await;

        let reply = result?;
        if reply.message_type() != MessageType::Reply {
            warn!(%reply, "Lock service answered with a non-reply message");
        }
        Ok(reply)
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Close the connection. Safe to call when not connected.
    pub async fn close(&mut self) {
        if let Some(framed) = self.framed.take() {
            let mut stream = framed.into_inner();
            let shutdown_timeout = Duration::from_millis(500);
            match tokio::time::timeout(shutdown_timeout, stream.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Error during shutdown: {}", e),
                Err(_) => debug!("Shutdown timeout during close"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::{Pin, PinValue};

    fn message() -> Message {
        Message::exclusive_write("gate1", Pin::new(18).unwrap(), PinValue::High).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = TcpGpioClientConfig::default();
        assert_eq!(config.server_addr.port(), 7777);
        assert_eq!(config.timeout.as_millis(), 5000);
    }

    #[test]
    fn test_client_not_connected_initially() {
        let client = TcpGpioClient::new(TcpGpioClientConfig::default());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_send_without_connect() {
        let mut client = TcpGpioClient::new(TcpGpioClientConfig::default());
        let result = client.send(message()).await;
        assert!(matches!(result, Err(TcpGpioClientError::NotConnected)));
    }

    #[tokio::test]
    async fn test_recv_without_connect() {
        let mut client = TcpGpioClient::new(TcpGpioClientConfig::default());
        let result = client.recv().await;
        assert!(matches!(result, Err(TcpGpioClientError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connection_timeout() {
        // RFC 5737 TEST-NET-1, never routed
        let config = TcpGpioClientConfig {
            server_addr: "192.0.2.1:9999".parse().unwrap(),
            timeout: Duration::from_millis(100),
        };

        let mut client = TcpGpioClient::new(config);
        let result = client.connect().await;

        assert!(matches!(
            result,
            Err(TcpGpioClientError::ConnectionTimeout(_)) | Err(TcpGpioClientError::Io(_))
        ));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_multiple_close_calls() {
        let mut client = TcpGpioClient::new(TcpGpioClientConfig::default());
        client.close().await;
        client.close().await;
        assert!(!client.is_connected());
    }
}
