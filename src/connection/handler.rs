//! Connection Handler Module
//!
//! One [`ConnectionHandler`] owns one client session from accept to close.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Decode every complete   │ │
//!    │  │ command in the buffer   │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │  execute +    │
//!    │              │  queue reply  │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Flush queued replies    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read bytes (or stop on  │ │
//!    │  │ shutdown signal)        │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. EOF / QUIT / protocol error / I/O error / shutdown
//! ```
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a `BytesMut`: a read may end in the middle
//! of a command or carry several pipelined commands. Replies go through a
//! `BufWriter` and are flushed once per batch, when the buffer holds no more
//! complete commands, so a pipeline costs one write instead of one per
//! command. Replies always leave in request order.

use crate::commands::CommandHandler;
use crate::protocol::parser::MAX_BULK_SIZE;
use crate::protocol::{Command, ParseError, RespParser, RespValue};
use bytes::{Buf, BytesMut};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Largest request a client may have buffered, the same as Redis' default
/// query buffer limit. Always room for one maximum-size bulk string.
pub const MAX_REQUEST_SIZE: usize = 2 * MAX_BULK_SIZE;

/// How long one reply write may block before the client is dropped
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a blocked write may hold a session open once shutdown starts
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling, shared by all connections.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn active(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client closed its side between commands
    ClientClosed,
    /// Client sent `QUIT`
    Quit,
    /// Server is shutting down
    Shutdown,
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed request
    #[error("Protocol error: {0}")]
    ParseError(#[from] ParseError),

    /// Client closed the connection in the middle of a command
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Unparsed input exceeded the request size limit
    #[error("Buffer size limit exceeded")]
    BufferFull,

    /// The client stopped reading and a reply write hit [`WRITE_TIMEOUT`]
    #[error("Write timed out")]
    WriteTimeout,

    /// Shutdown was signalled while a reply write was blocked
    #[error("Abandoned a blocked write during shutdown")]
    ShutdownWhileWriting,
}

/// Handles a single client connection over any byte stream.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Bytes received but not yet decoded
    buffer: BytesMut,

    command_handler: CommandHandler,

    parser: RespParser,

    stats: Arc<ConnectionStats>,

    /// Flips to `true` when the server shuts down
    shutdown: watch::Receiver<bool>,

    max_request_size: usize,

    write_timeout: Duration,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: RespParser::new(),
            stats,
            shutdown,
            max_request_size: MAX_REQUEST_SIZE,
            write_timeout: WRITE_TIMEOUT,
        }
    }

    /// Overrides [`MAX_REQUEST_SIZE`].
    pub fn with_max_request_size(mut self, limit: usize) -> Self {
        self.max_request_size = limit;
        self
    }

    /// Overrides [`WRITE_TIMEOUT`].
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Runs the session to completion.
    pub async fn run(mut self) -> Result<CloseReason, ConnectionError> {
        debug!(client = %self.addr, "Session started");

        let result = self.main_loop().await;

        match &result {
            Ok(reason) => debug!(client = %self.addr, reason = ?reason, "Session ended"),
            Err(ConnectionError::IoError(e))
                if e.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<CloseReason, ConnectionError> {
        loop {
            while let Some(command) = self.next_command().await? {
                let quit = command.name.eq_ignore_ascii_case(b"QUIT");

                let reply = self.command_handler.execute(command);
                self.stats.command_processed();
                self.queue_reply(&reply).await?;

                if quit {
                    self.flush().await?;
                    return Ok(CloseReason::Quit);
                }
                if self.shutting_down() {
                    self.flush().await?;
                    return Ok(CloseReason::Shutdown);
                }
            }

            self.flush().await?;

            if self.shutting_down() {
                return Ok(CloseReason::Shutdown);
            }
            if self.buffer.len() > self.max_request_size {
                self.reject("too big request").await;
                return Err(ConnectionError::BufferFull);
            }

            if self.buffer.capacity() - self.buffer.len() < 1024 {
                self.buffer.reserve(INITIAL_BUFFER_SIZE);
            }

            let n = tokio::select! {
                read = self.stream.get_mut().read_buf(&mut self.buffer) => read?,
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        return Ok(CloseReason::Shutdown);
                    }
                    continue;
                }
            };

            if n == 0 {
                return if self.buffer.is_empty() {
                    Ok(CloseReason::ClientClosed)
                } else {
                    Err(ConnectionError::UnexpectedEof)
                };
            }

            self.stats.bytes_read(n);
            trace!(client = %self.addr, bytes = n, "Read data");
        }
    }

    /// Decodes the next complete command from the buffer, if any.
    ///
    /// A malformed frame is answered with a protocol error reply before the
    /// error is returned.
    async fn next_command(&mut self) -> Result<Option<Command>, ConnectionError> {
        match self.parser.decode(&self.buffer) {
            Ok(Some((command, consumed))) => {
                self.buffer.advance(consumed);
                trace!(
                    client = %self.addr,
                    command = %command.name_lossy(),
                    remaining = self.buffer.len(),
                    "Parsed command"
                );
                Ok(Some(command))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Malformed request, closing connection");
                self.reject(&e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// Best-effort `-ERR Protocol error: ...` reply before closing.
    async fn reject(&mut self, detail: &str) {
        let reply = RespValue::error(format!("ERR Protocol error: {}", detail));
        if self.queue_reply(&reply).await.is_ok() {
            let _ = self.flush().await;
        }
    }

    fn shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn queue_reply(&mut self, reply: &RespValue) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        bounded_write(
            self.stream.write_all(&bytes),
            self.write_timeout,
            &mut self.shutdown,
        )
        .await?;
        self.stats.bytes_written(bytes.len());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ConnectionError> {
        bounded_write(self.stream.flush(), self.write_timeout, &mut self.shutdown).await
    }
}

/// Drives a write to the client, giving up after `limit`, or once shutdown
/// has been pending for longer than [`SHUTDOWN_GRACE`].
async fn bounded_write<F>(
    write: F,
    limit: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), ConnectionError>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        biased;
        written = tokio::time::timeout(limit, write) => match written {
            Ok(result) => result.map_err(ConnectionError::from),
            Err(_) => Err(ConnectionError::WriteTimeout),
        },
        () = shutdown_grace_expired(shutdown) => Err(ConnectionError::ShutdownWhileWriting),
    }
}

async fn shutdown_grace_expired(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as shutdown
    let _ = shutdown.wait_for(|stopping| *stopping).await;
    tokio::time::sleep(SHUTDOWN_GRACE).await;
}

/// Runs a connection to completion, logging how it ended.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    shutdown: watch::Receiver<bool>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!(client = %addr, "Client connected");
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, shutdown);
    match handler.run().await {
        Ok(reason) => info!(client = %addr, reason = ?reason, "Client disconnected"),
        Err(e) => info!(client = %addr, error = %e, "Client dropped"),
    }
}
