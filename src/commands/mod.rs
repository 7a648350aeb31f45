//! Command Registry & Executor
//!
//! Receives decoded [`Command`](crate::protocol::Command)s, executes them
//! against the storage engine and produces the reply.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Lookup       │  registry: static table, case-insensitive
//! │  - Arity        │
//! │  - Execute      │  admin / keys / strings / lists / hashes / sets
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! ### Connection / Server
//! - `PING`, `ECHO`, `QUIT`, `DBSIZE`, `FLUSHALL`, `FLUSHDB`
//! - `INFO`, `COMMAND`, `CONFIG GET|SET`
//!
//! ### Keys
//! - `DEL`, `EXISTS`, `EXPIRE`, `PEXPIRE`, `TTL`, `PTTL`, `PERSIST`
//! - `TYPE`, `KEYS`, `RENAME`
//!
//! ### Strings
//! - `GET`, `SET`, `SETNX`, `SETEX`, `GETDEL`, `MSET`, `MGET`
//! - `APPEND`, `STRLEN`, `INCR`, `DECR`, `INCRBY`, `DECRBY`
//!
//! ### Lists
//! - `LPUSH`, `RPUSH`, `LPOP`, `RPOP`, `LLEN`, `LINDEX`, `LRANGE`, `LSET`, `LREM`
//!
//! ### Hashes
//! - `HSET`, `HGET`, `HDEL`, `HEXISTS`, `HLEN`, `HGETALL`, `HKEYS`, `HVALS`, `HINCRBY`
//!
//! ### Sets
//! - `SADD`, `SREM`, `SISMEMBER`, `SMEMBERS`, `SCARD`

mod admin;
pub mod error;
pub mod handler;
mod hashes;
mod keys;
mod lists;
pub mod registry;
mod sets;
mod strings;

pub use error::{CommandError, CommandResult};
pub use handler::CommandHandler;
pub use registry::{lookup, CommandSpec};
