//! Connection Handler Module
//!
//! Each client connection is served by its own Tokio task running a
//! [`ConnectionHandler`]. Handlers share the store through a cloned
//! [`CommandHandler`](crate::commands::CommandHandler) and never hold a store
//! lock between commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read bytes  │───>│ Decode RESP │───>│ Execute cmd │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Queue reply │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use redkv::commands::CommandHandler;
//! use redkv::connection::{handle_connection, ConnectionStats};
//! use redkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tokio::sync::watch;
//!
//! # async fn serve() -> std::io::Result<()> {
//! let storage = Arc::new(StorageEngine::new());
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(storage);
//! let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! let listener = TcpListener::bind("127.0.0.1:6379").await?;
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler, stats, shutdown_rx));
//! # Ok(())
//! # }
//! ```

pub mod handler;

pub use handler::{
    handle_connection, CloseReason, ConnectionError, ConnectionHandler, ConnectionStats,
    MAX_REQUEST_SIZE, SHUTDOWN_GRACE, WRITE_TIMEOUT,
};
