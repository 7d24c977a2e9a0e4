//! TCPGPIO lock service.
//!
//! The service accepts any number of connections and multiplexes all of them
//! in one task: the listener and every connection's read half are awaited in
//! a single `tokio::select!`, so the [`PinLockTable`] needs no locking.
//!
//! # Connection Handling
//!
//! - One read is one message (see [`TcpGpioCodec`])
//! - A malformed message is logged and dropped; the connection stays open
//! - End of stream closes and forgets the connection
//! - A failing pin write is logged; the reply is still sent
//!
//! # Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use tollgate_core::{Pin, PinValue};
//! use tollgate_network::{LockService, LockServiceConfig, PinWriter};
//!
//! struct LogPins;
//!
//! impl PinWriter for LogPins {
//!     type Error = std::convert::Infallible;
//!
//!     fn write_pin(&self, pin: Pin, value: PinValue) -> Result<(), Self::Error> {
//!         println!("pin {pin} -> {value}");
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = LockService::bind(LockServiceConfig::default(), LogPins).await?;
//! service.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

use futures::stream::{self, BoxStream, SelectAll, SplitSink};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use tollgate_core::constants::{TCPGPIO_BUFFER_SIZE, TCPGPIO_DEFAULT_PORT};
use tollgate_core::{Pin, PinValue};
use tollgate_protocol::{Message, TcpGpioCodec};

use crate::lock::PinLockTable;

/// Sink that drives physical pins for the lock service.
pub trait PinWriter: Send + Sync {
    type Error: fmt::Display;

    /// Set `pin` to `value`.
    fn write_pin(&self, pin: Pin, value: PinValue) -> Result<(), Self::Error>;
}

/// Configuration for the lock service.
///
/// # Example
///
/// ```
/// use tollgate_network::LockServiceConfig;
///
/// let config = LockServiceConfig::default();
/// assert_eq!(config.bind_addr.port(), 7777);
/// assert_eq!(config.max_read, 1024);
/// ```
#[derive(Debug, Clone)]
pub struct LockServiceConfig {
    /// Address to bind the listener to
    pub bind_addr: SocketAddr,

    /// Maximum number of simultaneous connections
    pub max_connections: usize,

    /// Bytes consumed per read, i.e. the largest accepted message
    pub max_read: usize,
}

impl Default for LockServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], TCPGPIO_DEFAULT_PORT)),
            max_connections: 100,
            max_read: TCPGPIO_BUFFER_SIZE,
        }
    }
}

/// Errors that stop the lock service.
#[derive(Debug, Error)]
pub enum LockServiceError {
    #[error("Failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Identifier of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Frame = io::Result<tollgate_core::Result<Message>>;

enum Inbound {
    Frame(Frame),
    Closed,
}

struct Connection {
    sink: SplitSink<Framed<TcpStream, TcpGpioCodec>, Message>,
    addr: SocketAddr,
}

/// TCPGPIO lock service.
pub struct LockService<W: PinWriter> {
    listener: TcpListener,
    writer: W,
    locks: PinLockTable,
    config: LockServiceConfig,
    connections: HashMap<ConnectionId, Connection>,
    inbound: SelectAll<BoxStream<'static, (ConnectionId, Inbound)>>,
    next_id: u64,
}

impl<W: PinWriter> LockService<W> {
    /// Bind the listener.
    ///
    /// # Errors
    ///
    /// Returns `BindFailed` if the address is in use or not available.
    pub async fn bind(config: LockServiceConfig, writer: W) -> Result<Self, LockServiceError> {
        let listener = TcpListener::bind(config.bind_addr).await.map_err(|source| {
            LockServiceError::BindFailed {
                addr: config.bind_addr,
                source,
            }
        })?;

        info!(
            "Lock service listening on {} (max {} connections)",
            config.bind_addr, config.max_connections
        );

        Ok(Self {
            listener,
            writer,
            locks: PinLockTable::new(),
            config,
            connections: HashMap::new(),
            inbound: SelectAll::new(),
            next_id: 0,
        })
    }

    /// Actual bound address (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, LockServiceError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn locks(&self) -> &PinLockTable {
        &self.locks
    }

    /// Serve until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), LockServiceError> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Lock service shutting down");
                    break;
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((socket, addr)) => self.register(socket, addr),
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                },

                Some((id, inbound)) = self.inbound.next(), if !self.inbound.is_empty() => {
                    self.on_inbound(id, inbound).await;
                }
            }
        }

        self.connections.clear();
        Ok(())
    }

    fn register(&mut self, socket: TcpStream, addr: SocketAddr) {
        if self.connections.len() >= self.config.max_connections {
            error!(
                addr = %addr,
                max_connections = self.config.max_connections,
                "Connection rejected: maximum connections reached"
            );
            return;
        }

        if let Err(e) = socket.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        let framed = Framed::new(socket, TcpGpioCodec::with_max_read(self.config.max_read));
        let (sink, frames) = framed.split();

        let frames = frames
            .map(move |frame| (id, Inbound::Frame(frame)))
            .chain(stream::once(async move { (id, Inbound::Closed) }))
            .boxed();

        self.inbound.push(frames);
        self.connections.insert(id, Connection { sink, addr });

        debug!(
            connection = %id,
            addr = %addr,
            total = self.connections.len(),
            "Connection accepted"
        );
    }

    async fn on_inbound(&mut self, id: ConnectionId, inbound: Inbound) {
        match inbound {
            Inbound::Closed => {
                if let Some(conn) = self.connections.remove(&id) {
                    debug!(connection = %id, addr = %conn.addr, "Connection closed");
                }
            }
            Inbound::Frame(Err(e)) => {
                warn!(connection = %id, error = %e, "Read failed, dropping connection");
                self.connections.remove(&id);
            }
            Inbound::Frame(Ok(Err(e))) => {
                error!(connection = %id, error = %e, "Invalid message dropped");
            }
            Inbound::Frame(Ok(Ok(message))) => self.on_message(id, message).await,
        }
    }

    async fn on_message(&mut self, id: ConnectionId, message: Message) {
        trace!(connection = %id, %message, "Message received");

        let outcome = self.locks.apply(&message);

        if let Some((pin, value)) = outcome.write {
            match self.writer.write_pin(pin, value) {
                Ok(()) => info!(pin = %pin, value = %value, "GPIO pin set"),
                Err(e) => error!(pin = %pin, value = %value, error = %e, "GPIO write failed"),
            }
        }

        let Some(reply) = outcome.reply else {
            debug!(
                connection = %id,
                device_id = message.device_id(),
                pin = %message.pin(),
                "Pin is locked, message ignored"
            );
            return;
        };

        let Some(conn) = self.connections.get_mut(&id) else {
            return;
        };
        if let Err(e) = conn.sink.send(reply).await {
            warn!(connection = %id, error = %e, "Failed to send reply, dropping connection");
            self.connections.remove(&id);
        }
    }
}
