//! Command Executor
//!
//! [`CommandHandler::execute`] turns one decoded [`Command`] into one reply:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  lookup()   │───>│   arity     │───>│  handler    │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      StorageEngine          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every handler performs exactly one store operation (single- or multi-key),
//! so each command is atomic with respect to every other command touching
//! the same keys. Errors never escape as `Err`: they are rendered as error
//! replies and the connection carries on.

use super::error::{CommandError, CommandResult};
use super::registry;
use crate::protocol::{Command, RespValue};
use crate::storage::engine::parse_i64;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Executes commands against the shared store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
    /// Server start time for INFO
    start_time: Instant,
}

impl CommandHandler {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self {
            storage,
            start_time: Instant::now(),
        }
    }

    pub fn storage(&self) -> &StorageEngine {
        &self.storage
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Executes a command and returns the reply to send.
    pub fn execute(&self, command: Command) -> RespValue {
        match self.dispatch(&command) {
            Ok(reply) => reply,
            Err(err) => {
                trace!(command = %command.name_lossy(), error = %err, "Command failed");
                err.into()
            }
        }
    }

    fn dispatch(&self, command: &Command) -> CommandResult {
        let spec = registry::lookup(&command.name).ok_or_else(|| CommandError::unknown(command))?;
        spec.check_arity(command.args.len())?;
        (spec.run)(self, &command.args)
    }
}

/// Parses an argument as a base-10 `i64`.
pub(crate) fn parse_int(arg: &[u8]) -> Result<i64, CommandError> {
    parse_i64(arg).ok_or(CommandError::NotInteger)
}

/// Converts a relative expire argument into a TTL.
///
/// `unit_ms` is 1000 for seconds and 1 for milliseconds. Returns `Ok(None)`
/// for non-positive values, which expire the key immediately.
pub(crate) fn parse_ttl(
    arg: &[u8],
    unit_ms: u64,
    command: &'static str,
) -> Result<Option<Duration>, CommandError> {
    let amount = parse_int(arg)?;
    if amount <= 0 {
        return Ok(None);
    }

    (amount as u64)
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .filter(|ttl| Instant::now().checked_add(*ttl).is_some())
        .map(Some)
        .ok_or(CommandError::InvalidExpireTime(command))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn create_handler() -> CommandHandler {
        CommandHandler::new(Arc::new(StorageEngine::new()))
    }

    pub(crate) fn cmd(parts: &[&str]) -> Command {
        Command::from_parts(parts).unwrap()
    }

    pub(crate) fn run(handler: &CommandHandler, parts: &[&str]) -> RespValue {
        handler.execute(cmd(parts))
    }

    pub(crate) fn bulk(s: &str) -> RespValue {
        RespValue::bulk_string(Bytes::from(s.to_string()))
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();
        assert_eq!(
            run(&handler, &["FROB", "x"]),
            RespValue::error("ERR unknown command 'FROB', with args beginning with: 'x' ")
        );
    }

    #[test]
    fn test_wrong_arity_names_command() {
        let handler = create_handler();
        assert_eq!(
            run(&handler, &["GET"]),
            RespValue::error("ERR wrong number of arguments for 'get' command")
        );
        assert_eq!(
            run(&handler, &["get", "a", "b"]),
            RespValue::error("ERR wrong number of arguments for 'get' command")
        );
    }

    #[test]
    fn test_command_names_are_case_insensitive() {
        let handler = create_handler();
        assert_eq!(run(&handler, &["sEt", "k", "v"]), RespValue::ok());
        assert_eq!(run(&handler, &["get", "k"]), bulk("v"));
    }

    #[test]
    fn test_parse_ttl() {
        assert_eq!(parse_ttl(b"10", 1000, "expire"), Ok(Some(Duration::from_secs(10))));
        assert_eq!(parse_ttl(b"0", 1000, "expire"), Ok(None));
        assert_eq!(parse_ttl(b"-5", 1, "pexpire"), Ok(None));
        assert_eq!(parse_ttl(b"abc", 1, "pexpire"), Err(CommandError::NotInteger));
        assert_eq!(
            parse_ttl(i64::MAX.to_string().as_bytes(), 1000, "expire"),
            Err(CommandError::InvalidExpireTime("expire"))
        );
    }
}
