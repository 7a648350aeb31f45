//! Stored Values
//!
//! A key holds exactly one [`Value`] variant for its whole life. Commands
//! that target a different variant fail with `WRONGTYPE` instead of
//! converting the value.

use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

/// The value stored under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Binary-safe string, also used for integers (`INCR` and friends)
    String(Bytes),
    /// Ordered sequence with O(1) push/pop at both ends
    List(VecDeque<Bytes>),
    /// Field to value mapping
    Hash(HashMap<Bytes, Bytes>),
    /// Unordered collection of unique members
    Set(HashSet<Bytes>),
}

impl Value {
    pub fn string(data: impl Into<Bytes>) -> Self {
        Value::String(data.into())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Hash(_) => ValueType::Hash,
            Value::Set(_) => ValueType::Set,
        }
    }

    pub fn as_string(&self) -> Option<&Bytes> {
        match self {
            Value::String(data) => Some(data),
            _ => None,
        }
    }
}

/// The variant tag of a [`Value`], as reported by `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    List,
    Hash,
    Set,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Hash => "hash",
            ValueType::Set => "set",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value plus its optional expiry deadline.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }

    /// Time left before expiry, `None` for persistent entries.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

/// Collection variants that can be borrowed out of a [`Value`].
///
/// A key never holds an empty collection: the engine removes the key once
/// `is_drained` reports true.
pub(crate) trait Container: Default {
    fn from_value(value: &Value) -> Option<&Self>;
    fn from_value_mut(value: &mut Value) -> Option<&mut Self>;
    fn into_value(self) -> Value;
    fn is_drained(&self) -> bool;
}

impl Container for VecDeque<Bytes> {
    fn from_value(value: &Value) -> Option<&Self> {
        match value {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
        match value {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::List(self)
    }

    fn is_drained(&self) -> bool {
        self.is_empty()
    }
}

impl Container for HashMap<Bytes, Bytes> {
    fn from_value(value: &Value) -> Option<&Self> {
        match value {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
        match value {
            Value::Hash(hash) => Some(hash),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Hash(self)
    }

    fn is_drained(&self) -> bool {
        self.is_empty()
    }
}

impl Container for HashSet<Bytes> {
    fn from_value(value: &Value) -> Option<&Self> {
        match value {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
        match value {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Set(self)
    }

    fn is_drained(&self) -> bool {
        self.is_empty()
    }
}
