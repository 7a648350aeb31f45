//! Server configuration from command-line arguments.

use crate::storage::ExpiryConfig;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::time::Duration;

/// Default listen backlog, the same as Redis
pub const DEFAULT_BACKLOG: u32 = 511;

/// Command-line arguments for the server
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "redkv")]
#[command(version)]
#[command(about = "An in-memory key-value server speaking the Redis protocol", long_about = None)]
pub struct Config {
    /// Address to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Length of the pending-connection queue
    #[arg(long, default_value_t = DEFAULT_BACKLOG)]
    pub backlog: u32,

    /// Base interval of the background expiry sweep in milliseconds (0 disables it)
    #[arg(long, default_value_t = 100)]
    pub sweep_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            sweep_interval_ms: 100,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Returns the bind address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sweeper settings, or `None` when active expiry is disabled.
    pub fn expiry(&self) -> Option<ExpiryConfig> {
        (self.sweep_interval_ms > 0)
            .then(|| ExpiryConfig::with_interval(Duration::from_millis(self.sweep_interval_ms)))
    }
}
