//! TCP Listener / Acceptor
//!
//! [`Server::bind`] opens the listening socket; [`Server::run`] accepts
//! clients until the shutdown future resolves, spawning one
//! [`handle_connection`] task per client. All tasks share one
//! [`StorageEngine`] through a cloned [`CommandHandler`].
//!
//! ## Shutdown sequence
//!
//! 1. stop accepting
//! 2. signal every connection; each finishes the command it is running
//!    and closes. A reply write to a client that stopped reading is
//!    abandoned after a short grace period.
//! 3. wait for all connection tasks, aborting stragglers after a timeout
//! 4. stop the expiry sweeper
//! 5. close the listening socket

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::connection::{handle_connection, ConnectionStats, SHUTDOWN_GRACE};
use crate::storage::{ExpiryConfig, ExpirySweeper, StorageEngine};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{lookup_host, TcpListener, TcpSocket};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Upper bound on waiting for connections to close after shutdown is
/// signalled; anything still running afterwards is aborted.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5 * SHUTDOWN_GRACE.as_secs());

/// Startup failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to resolve {addr}: {source}")]
    Resolve { addr: String, source: io::Error },

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("failed to listen on {addr}: {source}")]
    Listen { addr: SocketAddr, source: io::Error },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A bound server, ready to accept connections.
pub struct Server {
    listener: TcpListener,
    handler: CommandHandler,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
    expiry: Option<ExpiryConfig>,
}

impl Server {
    /// Binds the listening socket with `SO_REUSEADDR` and the configured
    /// backlog, over a fresh, empty store.
    pub async fn bind(config: &Config) -> Result<Self, ServerError> {
        Self::bind_with_storage(config, Arc::new(StorageEngine::new())).await
    }

    /// Like [`Server::bind`], serving an existing store.
    pub async fn bind_with_storage(
        config: &Config,
        storage: Arc<StorageEngine>,
    ) -> Result<Self, ServerError> {
        let addr = resolve(&config.bind_address()).await?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|source| ServerError::Bind { addr, source })?;

        socket
            .set_reuseaddr(true)
            .and_then(|()| socket.bind(addr))
            .map_err(|source| ServerError::Bind { addr, source })?;

        let listener = socket
            .listen(config.backlog)
            .map_err(|source| ServerError::Listen { addr, source })?;

        info!(
            addr = %listener.local_addr()?,
            backlog = config.backlog,
            "Listening for connections"
        );

        Ok(Self {
            listener,
            handler: CommandHandler::new(Arc::clone(&storage)),
            storage,
            stats: Arc::new(ConnectionStats::new()),
            expiry: config.expiry(),
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn storage(&self) -> Arc<StorageEngine> {
        Arc::clone(&self.storage)
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Serves clients until `shutdown` resolves, then shuts down gracefully.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let Server {
            listener,
            handler,
            storage,
            stats,
            expiry,
        } = self;

        let sweeper = expiry.map(|config| ExpirySweeper::start(Arc::clone(&storage), config));
        let (notify_tx, notify_rx) = watch::channel(false);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(client = %addr, error = %e, "Failed to set TCP_NODELAY");
                        }
                        connections.spawn(handle_connection(
                            stream,
                            addr,
                            handler.clone(),
                            Arc::clone(&stats),
                            notify_rx.clone(),
                        ));
                    }
                    Err(e) => {
                        // Usually fd exhaustion; back off instead of spinning
                        error!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Connection task failed");
                    }
                }
            }
        }

        info!(
            active_connections = connections.len(),
            "Shutting down, no longer accepting connections"
        );

        let _ = notify_tx.send(true);
        if tokio::time::timeout(DRAIN_TIMEOUT, drain(&mut connections))
            .await
            .is_err()
        {
            warn!(
                remaining = connections.len(),
                "Connections still open after drain timeout, aborting them"
            );
            connections.abort_all();
            drain(&mut connections).await;
        }

        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
        }
        drop(listener);

        info!("Server shutdown complete");
    }
}

async fn drain(connections: &mut JoinSet<()>) {
    while let Some(joined) = connections.join_next().await {
        match joined {
            Err(e) if !e.is_cancelled() => {
                warn!(error = %e, "Connection task failed during shutdown")
            }
            _ => {}
        }
    }
}

async fn resolve(addr: &str) -> Result<SocketAddr, ServerError> {
    let mut candidates = lookup_host(addr)
        .await
        .map_err(|source| ServerError::Resolve {
            addr: addr.to_string(),
            source,
        })?;

    candidates.next().ok_or_else(|| ServerError::Resolve {
        addr: addr.to_string(),
        source: io::Error::new(io::ErrorKind::AddrNotAvailable, "no address found"),
    })
}
