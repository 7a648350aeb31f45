//! # RedKV - An In-Memory Key-Value Server
//!
//! RedKV keeps typed values (strings, lists, hashes, sets) in memory and
//! serves them over TCP using the Redis serialization protocol (RESP), so
//! `redis-cli` and ordinary Redis clients can talk to it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               RedKV                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Server    │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │   RESP      │    │              StorageEngine                   │   │
//! │  │   Codec     │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │  └─────────────┘    │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use redkv::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::bind(&Config::default()).await?;
//!     server.run(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP codec and the decoded [`Command`](protocol::Command)
//! - [`storage`]: sharded, typed store with lazy and active expiry
//! - [`commands`]: command registry and executor
//! - [`connection`]: per-client read / execute / reply loop
//! - [`server`]: listener, accept loop and graceful shutdown
//! - [`config`]: command-line configuration
//!
//! ## Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: an expired key is removed when it is next touched
//! 2. **Active**: a background task periodically scans every shard and
//!    removes the keys whose deadline has passed
//!
//! Either way, an expired key is never observable.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Command, ParseError, RespParser, RespValue};
pub use server::{Server, ServerError};
pub use storage::{ExpiryConfig, ExpirySweeper, StorageEngine};

/// The default port RedKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host RedKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of RedKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
