//! Storage Engine Module
//!
//! The keyspace: a sharded, thread-safe map from binary keys to typed values
//! with optional expiry, plus the background sweeper that reclaims expired
//! keys nobody reads.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! - `value`: the [`Value`] variants (string, list, hash, set) and [`Entry`]
//! - `engine`: [`StorageEngine`] and all typed operations
//! - `expiry`: [`ExpirySweeper`]
//! - `glob`: pattern matching for `KEYS`
//!
//! ## Example
//!
//! ```
//! use redkv::storage::{ListEnd, StorageEngine, StoreError, Value};
//! use bytes::Bytes;
//!
//! let engine = StorageEngine::new();
//! let key = Bytes::from("queue");
//!
//! engine.push(&key, vec![Bytes::from("job1")], ListEnd::Right).unwrap();
//! assert_eq!(engine.llen(&key), Ok(1));
//!
//! // A list is not a string
//! assert_eq!(engine.get_string(&key), Err(StoreError::WrongType));
//!
//! engine.set(key.clone(), Value::string("now a string"), None);
//! assert_eq!(engine.strlen(&key), Ok(12));
//! ```

pub mod engine;
pub mod expiry;
pub mod glob;
pub mod value;

pub use engine::{
    ListEnd, SetCondition, SetOptions, SetOutcome, StorageEngine, StorageStats, StoreError,
    StoreResult, TtlState,
};
pub use expiry::{ExpiryConfig, ExpirySweeper};
pub use glob::glob_match;
pub use value::{Entry, Value, ValueType};
