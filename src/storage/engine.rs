//! Thread-Safe Storage Engine with Expiry Support
//!
//! The engine owns every key in the server. It is shared between connection
//! tasks behind an `Arc` and is the only place that mutates stored data.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: keys are spread over 64 `RwLock`ed maps by hash.
//! 2. **One value enum**: strings, lists, hashes and sets live in the same
//!    map, so a key can never exist twice under different types.
//! 3. **Validate, then mutate**: every operation checks the stored variant
//!    (and parses numbers) before changing anything, so a failed command
//!    leaves the store untouched.
//! 4. **Lazy Expiry**: an expired entry is removed by whichever operation
//!    touches it first; the background sweeper reclaims the rest.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A single-key operation holds its shard's lock for its whole duration.
//! Multi-key operations (`delete_many`, `set_many`, `rename`, ...) lock every
//! shard they touch in ascending shard order, which rules out lock cycles
//! between two multi-key commands. `flush` locks all shards the same way.
//! Locks are never held across an `.await`.

use crate::storage::glob::glob_match;
use crate::storage::value::{Container, Entry, Value, ValueType};
use bytes::Bytes;
use std::collections::hash_map::{self, DefaultHasher};
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

type ShardMap = HashMap<Bytes, Entry>;

/// Errors returned by store operations. None of them leave partial writes.
///
/// The `Display` text is the exact error line sent to clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    #[error("ERR hash value is not an integer")]
    HashNotInteger,

    #[error("ERR increment or decrement would overflow")]
    Overflow,

    #[error("ERR no such key")]
    NoSuchKey,

    #[error("ERR index out of range")]
    IndexOutOfRange,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which end of a list an operation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEnd {
    Left,
    Right,
}

/// Precondition for `SET`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetCondition {
    #[default]
    Always,
    /// `NX`: only when the key does not exist
    IfAbsent,
    /// `XX`: only when the key already exists
    IfPresent,
}

/// Options accepted by [`StorageEngine::set_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub condition: SetCondition,
    /// Keep the existing key's expiry instead of clearing it
    pub keep_ttl: bool,
    /// Return the previous string value
    pub get: bool,
}

/// What a conditional set did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    pub applied: bool,
    /// Previous string value, only filled in when [`SetOptions::get`] is set
    pub previous: Option<Bytes>,
}

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlState {
    Missing,
    NoExpiry,
    Remaining(Duration),
}

/// The store shared by all connections.
///
/// # Example
///
/// ```
/// use redkv::storage::{StorageEngine, Value};
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("name"), Value::string("Ariz"), None);
/// assert_eq!(engine.get_string(b"name"), Ok(Some(Bytes::from("Ariz"))));
///
/// engine.set(Bytes::from("session"), Value::string("abc123"), Some(Duration::from_secs(60)));
/// assert!(engine.exists(b"session"));
/// ```
pub struct StorageEngine {
    shards: Vec<RwLock<ShardMap>>,

    /// Statistics: number of expired keys reclaimed (lazily or by the sweeper)
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("keys", &self.len())
            .field("expired", &self.expired_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Write guards over a set of shards, acquired in ascending index order.
struct LockedShards<'a> {
    guards: Vec<Option<RwLockWriteGuard<'a, ShardMap>>>,
}

impl LockedShards<'_> {
    fn get_mut(&mut self, key: &[u8]) -> Option<&mut ShardMap> {
        self.guards
            .get_mut(shard_index(key))
            .and_then(|guard| guard.as_deref_mut())
    }
}

#[inline]
fn shard_index(key: &[u8]) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % NUM_SHARDS
}

impl StorageEngine {
    pub fn new() -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
            expired_count: AtomicU64::new(0),
        }
    }

    // ========================================================================
    // Locking helpers
    // ========================================================================

    fn read_shard(&self, idx: usize) -> RwLockReadGuard<'_, ShardMap> {
        self.shards[idx].read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_shard(&self, idx: usize) -> RwLockWriteGuard<'_, ShardMap> {
        self.shards[idx].write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write-locks the shard owning `key` and drops the entry if it expired.
    fn lock_key(&self, key: &[u8]) -> RwLockWriteGuard<'_, ShardMap> {
        let mut map = self.write_shard(shard_index(key));
        self.purge_if_expired(&mut map, key, Instant::now());
        map
    }

    /// Write-locks every shard owning one of `keys`, lowest index first.
    fn lock_keys<K: AsRef<[u8]>>(&self, keys: &[K]) -> LockedShards<'_> {
        let mut wanted = [false; NUM_SHARDS];
        for key in keys {
            wanted[shard_index(key.as_ref())] = true;
        }

        let guards = wanted
            .iter()
            .enumerate()
            .map(|(idx, &lock)| lock.then(|| self.write_shard(idx)))
            .collect();

        LockedShards { guards }
    }

    /// Removes `key` from a locked shard if it has expired.
    ///
    /// Idempotent: a second call, or a racing reader, finds nothing to do.
    fn purge_if_expired(&self, map: &mut ShardMap, key: &[u8], now: Instant) -> bool {
        let expired = map.get(key).is_some_and(|entry| entry.is_expired_at(now));
        if expired {
            map.remove(key);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
        }
        expired
    }

    /// Runs `f` on the live entry for `key` (or `None`).
    ///
    /// Takes a read lock first; only an expired entry upgrades to a write
    /// lock so it can be removed.
    fn view<R>(&self, key: &[u8], f: impl FnOnce(Option<&Entry>) -> R) -> R {
        let idx = shard_index(key);
        let now = Instant::now();

        {
            let map = self.read_shard(idx);
            match map.get(key) {
                Some(entry) if entry.is_expired_at(now) => {}
                other => return f(other),
            }
        }

        let mut map = self.write_shard(idx);
        self.purge_if_expired(&mut map, key, now);
        f(map.get(key))
    }

    /// Runs `f` on the collection stored at `key`, read-only.
    ///
    /// `Ok(None)` if the key is absent, `WrongType` if it holds another
    /// variant.
    fn with_ref<T: Container, R>(&self, key: &[u8], f: impl FnOnce(&T) -> R) -> StoreResult<Option<R>> {
        self.view(key, |entry| match entry {
            None => Ok(None),
            Some(entry) => T::from_value(&entry.value)
                .map(|container| Some(f(container)))
                .ok_or(StoreError::WrongType),
        })
    }

    /// Runs `f` on the collection stored at `key` under the shard write lock.
    ///
    /// With `create`, an absent key starts out as an empty collection and is
    /// only inserted if `f` succeeds and leaves it non-empty. A collection
    /// that `f` drains is removed.
    fn with_mut<T: Container, R>(
        &self,
        key: &Bytes,
        create: bool,
        f: impl FnOnce(&mut T) -> StoreResult<R>,
    ) -> StoreResult<Option<R>> {
        let mut map = self.lock_key(key);

        match map.entry(key.clone()) {
            hash_map::Entry::Occupied(mut occupied) => {
                let container =
                    T::from_value_mut(&mut occupied.get_mut().value).ok_or(StoreError::WrongType)?;
                let out = f(container)?;
                if container.is_drained() {
                    occupied.remove();
                }
                Ok(Some(out))
            }
            hash_map::Entry::Vacant(vacant) if create => {
                let mut container = T::default();
                let out = f(&mut container)?;
                if !container.is_drained() {
                    vacant.insert(Entry::new(container.into_value(), None));
                }
                Ok(Some(out))
            }
            hash_map::Entry::Vacant(_) => Ok(None),
        }
    }

    // ========================================================================
    // Generic key operations
    // ========================================================================

    /// Returns a copy of the value at `key`, or `None` if missing or expired.
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.view(key, |entry| entry.map(|e| e.value.clone()))
    }

    /// Stores `value` under `key`, replacing any previous value and type.
    ///
    /// The expiry is set from `ttl`, or cleared when `ttl` is `None`.
    pub fn set(&self, key: Bytes, value: Value, ttl: Option<Duration>) {
        let mut map = self.write_shard(shard_index(&key));
        map.insert(key, Entry::new(value, ttl));
    }

    /// Deletes a key. Returns `true` if it existed.
    pub fn delete(&self, key: &[u8]) -> bool {
        let mut map = self.lock_key(key);
        map.remove(key).is_some()
    }

    /// Deletes several keys atomically. Returns how many existed.
    pub fn delete_many(&self, keys: &[Bytes]) -> u64 {
        let mut locked = self.lock_keys(keys);
        let now = Instant::now();
        let mut deleted = 0;

        for key in keys {
            if let Some(map) = locked.get_mut(key) {
                if self.purge_if_expired(map, key, now) {
                    continue;
                }
                if map.remove(key).is_some() {
                    deleted += 1;
                }
            }
        }
        deleted
    }

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &[u8]) -> bool {
        self.view(key, |entry| entry.is_some())
    }

    /// Counts how many of `keys` exist; repeated keys count every time.
    pub fn exists_many(&self, keys: &[Bytes]) -> u64 {
        let mut locked = self.lock_keys(keys);
        let now = Instant::now();

        keys.iter()
            .filter(|key| match locked.get_mut(key) {
                Some(map) => !self.purge_if_expired(map, key, now) && map.contains_key(&key[..]),
                None => false,
            })
            .count() as u64
    }

    /// Returns the variant stored at `key`.
    pub fn key_type(&self, key: &[u8]) -> Option<ValueType> {
        self.view(key, |entry| entry.map(|e| e.value.value_type()))
    }

    /// Sets an expiry on an existing key. Returns `false` if the key is missing.
    pub fn expire(&self, key: &[u8], ttl: Duration) -> bool {
        let mut map = self.lock_key(key);
        match map.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                true
            }
            None => false,
        }
    }

    /// Removes the expiry from a key.
    ///
    /// Returns `true` only if the key existed and had an expiry.
    pub fn persist(&self, key: &[u8]) -> bool {
        let mut map = self.lock_key(key);
        map.get_mut(key)
            .and_then(|entry| entry.expires_at.take())
            .is_some()
    }

    /// Reports the remaining lifetime of a key.
    pub fn ttl(&self, key: &[u8]) -> TtlState {
        let now = Instant::now();
        self.view(key, |entry| match entry {
            None => TtlState::Missing,
            Some(entry) => entry
                .remaining(now)
                .map_or(TtlState::NoExpiry, TtlState::Remaining),
        })
    }

    /// Moves the value (and expiry) of `src` to `dst`, overwriting `dst`.
    pub fn rename(&self, src: &Bytes, dst: Bytes) -> StoreResult<()> {
        let keys = [src.clone(), dst.clone()];
        let mut locked = self.lock_keys(&keys);
        let now = Instant::now();

        let entry = match locked.get_mut(src) {
            Some(map) => {
                self.purge_if_expired(map, src, now);
                map.remove(&src[..]).ok_or(StoreError::NoSuchKey)?
            }
            None => return Err(StoreError::NoSuchKey),
        };

        if let Some(map) = locked.get_mut(&dst) {
            map.insert(dst, entry);
        }
        Ok(())
    }

    /// Returns all live keys matching a glob pattern.
    ///
    /// Shards are scanned one at a time, so the result is consistent per
    /// shard but not a single point-in-time snapshot of the whole store.
    pub fn keys(&self, pattern: &[u8]) -> Vec<Bytes> {
        let now = Instant::now();
        let match_all = pattern == b"*";
        let mut result = Vec::new();

        for idx in 0..NUM_SHARDS {
            let map = self.read_shard(idx);
            result.extend(
                map.iter()
                    .filter(|(key, entry)| {
                        !entry.is_expired_at(now) && (match_all || glob_match(pattern, key))
                    })
                    .map(|(key, _)| key.clone()),
            );
        }

        result
    }

    /// Atomically empties the store.
    pub fn flush(&self) {
        let mut guards: Vec<_> = (0..NUM_SHARDS).map(|idx| self.write_shard(idx)).collect();
        for map in guards.iter_mut() {
            map.clear();
        }
    }

    /// Number of keys, including expired keys not yet reclaimed.
    pub fn len(&self) -> usize {
        (0..NUM_SHARDS).map(|idx| self.read_shard(idx).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StorageStats {
        let mut keys = 0;
        let mut expires = 0;
        for idx in 0..NUM_SHARDS {
            let map = self.read_shard(idx);
            keys += map.len();
            expires += map.values().filter(|e| e.expires_at.is_some()).count();
        }

        StorageStats {
            keys,
            expires,
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Removes every expired entry. Returns the number removed.
    ///
    /// Called by the background expiry sweeper.
    pub fn cleanup_expired(&self) -> u64 {
        let now = Instant::now();
        let mut cleaned = 0u64;

        for idx in 0..NUM_SHARDS {
            let mut map = self.write_shard(idx);
            let before = map.len();
            map.retain(|_, entry| !entry.is_expired_at(now));
            cleaned += (before - map.len()) as u64;
        }

        if cleaned > 0 {
            self.expired_count.fetch_add(cleaned, Ordering::Relaxed);
        }
        cleaned
    }

    // ========================================================================
    // STRING OPERATIONS
    // ========================================================================

    /// Gets a string value. Fails with `WrongType` for other variants.
    pub fn get_string(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.view(key, |entry| match entry {
            None => Ok(None),
            Some(entry) => entry
                .value
                .as_string()
                .cloned()
                .map(Some)
                .ok_or(StoreError::WrongType),
        })
    }

    /// `SET` with its full option set, evaluated atomically.
    pub fn set_with(&self, key: Bytes, value: Bytes, options: &SetOptions) -> StoreResult<SetOutcome> {
        let mut map = self.lock_key(&key);

        let existing = map.get(&key);
        let previous = match existing {
            Some(entry) if options.get => Some(
                entry
                    .value
                    .as_string()
                    .cloned()
                    .ok_or(StoreError::WrongType)?,
            ),
            _ => None,
        };

        let applies = match options.condition {
            SetCondition::Always => true,
            SetCondition::IfAbsent => existing.is_none(),
            SetCondition::IfPresent => existing.is_some(),
        };

        if applies {
            let expires_at = match options.ttl {
                Some(ttl) => Some(Instant::now() + ttl),
                None if options.keep_ttl => existing.and_then(|e| e.expires_at),
                None => None,
            };
            map.insert(
                key,
                Entry {
                    value: Value::String(value),
                    expires_at,
                },
            );
        }

        Ok(SetOutcome {
            applied: applies,
            previous,
        })
    }

    /// Sets several string keys atomically, clearing their expiry.
    pub fn set_many(&self, pairs: Vec<(Bytes, Bytes)>) {
        let keys: Vec<Bytes> = pairs.iter().map(|(k, _)| k.clone()).collect();
        let mut locked = self.lock_keys(&keys);

        for (key, value) in pairs {
            if let Some(map) = locked.get_mut(&key) {
                map.insert(key, Entry::new(Value::String(value), None));
            }
        }
    }

    /// Gets several keys atomically. Missing and non-string keys yield `None`.
    pub fn get_many(&self, keys: &[Bytes]) -> Vec<Option<Bytes>> {
        let mut locked = self.lock_keys(keys);
        let now = Instant::now();

        keys.iter()
            .map(|key| {
                let map = locked.get_mut(key)?;
                self.purge_if_expired(map, key, now);
                map.get(&key[..]).and_then(|e| e.value.as_string().cloned())
            })
            .collect()
    }

    /// Gets a string value and deletes the key.
    pub fn get_del(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        let mut map = self.lock_key(key);
        let value = match map.get(key) {
            None => return Ok(None),
            Some(entry) => entry.value.as_string().cloned().ok_or(StoreError::WrongType)?,
        };
        map.remove(key);
        Ok(Some(value))
    }

    /// Adds `delta` to the integer stored at `key`, treating absent as 0.
    ///
    /// The key's expiry is preserved.
    pub fn incr_by(&self, key: &Bytes, delta: i64) -> StoreResult<i64> {
        let mut map = self.lock_key(key);

        let (current, expires_at) = match map.get(&key[..]) {
            None => (0, None),
            Some(entry) => {
                let data = entry.value.as_string().ok_or(StoreError::WrongType)?;
                (parse_i64(data).ok_or(StoreError::NotInteger)?, entry.expires_at)
            }
        };

        let new_value = current.checked_add(delta).ok_or(StoreError::Overflow)?;
        map.insert(
            key.clone(),
            Entry {
                value: Value::String(Bytes::from(new_value.to_string())),
                expires_at,
            },
        );

        Ok(new_value)
    }

    /// Appends to a string, creating it if needed. Returns the new length.
    pub fn append(&self, key: &Bytes, suffix: &[u8]) -> StoreResult<usize> {
        let mut map = self.lock_key(key);

        match map.get_mut(&key[..]) {
            Some(entry) => {
                let current = entry.value.as_string().ok_or(StoreError::WrongType)?;
                let mut joined = Vec::with_capacity(current.len() + suffix.len());
                joined.extend_from_slice(current);
                joined.extend_from_slice(suffix);
                let len = joined.len();
                entry.value = Value::String(Bytes::from(joined));
                Ok(len)
            }
            None => {
                map.insert(
                    key.clone(),
                    Entry::new(Value::String(Bytes::copy_from_slice(suffix)), None),
                );
                Ok(suffix.len())
            }
        }
    }

    /// Length of a string value, 0 if the key is missing.
    pub fn strlen(&self, key: &[u8]) -> StoreResult<usize> {
        Ok(self.get_string(key)?.map_or(0, |v| v.len()))
    }

    // ========================================================================
    // LIST OPERATIONS
    // ========================================================================

    /// Pushes values onto one end of a list, creating it if needed.
    ///
    /// Values are pushed one at a time, so `LPUSH k a b c` yields `[c, b, a]`.
    /// Returns the length of the list after the push.
    pub fn push(&self, key: &Bytes, values: Vec<Bytes>, end: ListEnd) -> StoreResult<usize> {
        let len = self.with_mut(key, true, |list: &mut VecDeque<Bytes>| {
            for value in values {
                match end {
                    ListEnd::Left => list.push_front(value),
                    ListEnd::Right => list.push_back(value),
                }
            }
            Ok(list.len())
        })?;
        Ok(len.unwrap_or(0))
    }

    /// Removes and returns one element from an end of a list.
    pub fn pop(&self, key: &Bytes, end: ListEnd) -> StoreResult<Option<Bytes>> {
        let popped = self.with_mut(key, false, |list: &mut VecDeque<Bytes>| {
            Ok(match end {
                ListEnd::Left => list.pop_front(),
                ListEnd::Right => list.pop_back(),
            })
        })?;
        Ok(popped.flatten())
    }

    pub fn llen(&self, key: &[u8]) -> StoreResult<usize> {
        Ok(self
            .with_ref(key, |list: &VecDeque<Bytes>| list.len())?
            .unwrap_or(0))
    }

    /// Element at `index`; negative indices count from the tail.
    pub fn lindex(&self, key: &[u8], index: i64) -> StoreResult<Option<Bytes>> {
        Ok(self
            .with_ref(key, |list: &VecDeque<Bytes>| {
                resolve_index(index, list.len()).and_then(|i| list.get(i).cloned())
            })?
            .flatten())
    }

    /// Elements from `start` to `stop` inclusive, with Redis clamping rules.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Bytes>> {
        Ok(self
            .with_ref(key, |list: &VecDeque<Bytes>| {
                let len = list.len() as i64;
                let start = if start < 0 { (len + start).max(0) } else { start };
                let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

                if start > stop || start >= len {
                    return Vec::new();
                }

                list.iter()
                    .skip(start as usize)
                    .take((stop - start + 1) as usize)
                    .cloned()
                    .collect()
            })?
            .unwrap_or_default())
    }

    /// Overwrites the element at `index`.
    pub fn lset(&self, key: &Bytes, index: i64, value: Bytes) -> StoreResult<()> {
        self.with_mut(key, false, |list: &mut VecDeque<Bytes>| {
            let i = resolve_index(index, list.len()).ok_or(StoreError::IndexOutOfRange)?;
            list[i] = value;
            Ok(())
        })?
        .ok_or(StoreError::NoSuchKey)
    }

    /// Removes elements equal to `value`.
    ///
    /// - count > 0: remove up to `count`, head to tail
    /// - count < 0: remove up to `|count|`, tail to head
    /// - count = 0: remove all
    pub fn lrem(&self, key: &Bytes, count: i64, value: &[u8]) -> StoreResult<usize> {
        let removed = self.with_mut(key, false, |list: &mut VecDeque<Bytes>| {
            let limit = if count == 0 {
                usize::MAX
            } else {
                count.unsigned_abs() as usize
            };
            let mut removed = 0usize;

            if count >= 0 {
                let mut i = 0;
                while i < list.len() && removed < limit {
                    if list[i] == value {
                        list.remove(i);
                        removed += 1;
                    } else {
                        i += 1;
                    }
                }
            } else {
                let mut i = list.len();
                while i > 0 && removed < limit {
                    i -= 1;
                    if list[i] == value {
                        list.remove(i);
                        removed += 1;
                    }
                }
            }
            Ok(removed)
        })?;
        Ok(removed.unwrap_or(0))
    }

    // ========================================================================
    // HASH OPERATIONS
    // ========================================================================

    /// Sets hash fields. Returns the number of fields that were new.
    pub fn hset(&self, key: &Bytes, pairs: Vec<(Bytes, Bytes)>) -> StoreResult<usize> {
        let added = self.with_mut(key, true, |hash: &mut HashMap<Bytes, Bytes>| {
            Ok(pairs
                .into_iter()
                .filter(|(field, value)| hash.insert(field.clone(), value.clone()).is_none())
                .count())
        })?;
        Ok(added.unwrap_or(0))
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> StoreResult<Option<Bytes>> {
        Ok(self
            .with_ref(key, |hash: &HashMap<Bytes, Bytes>| hash.get(field).cloned())?
            .flatten())
    }

    /// Deletes hash fields. Returns how many existed.
    pub fn hdel(&self, key: &Bytes, fields: &[Bytes]) -> StoreResult<usize> {
        let removed = self.with_mut(key, false, |hash: &mut HashMap<Bytes, Bytes>| {
            Ok(fields.iter().filter(|f| hash.remove(&f[..]).is_some()).count())
        })?;
        Ok(removed.unwrap_or(0))
    }

    pub fn hexists(&self, key: &[u8], field: &[u8]) -> StoreResult<bool> {
        Ok(self
            .with_ref(key, |hash: &HashMap<Bytes, Bytes>| hash.contains_key(field))?
            .unwrap_or(false))
    }

    pub fn hlen(&self, key: &[u8]) -> StoreResult<usize> {
        Ok(self
            .with_ref(key, |hash: &HashMap<Bytes, Bytes>| hash.len())?
            .unwrap_or(0))
    }

    /// All field/value pairs, in no particular order.
    pub fn hgetall(&self, key: &[u8]) -> StoreResult<Vec<(Bytes, Bytes)>> {
        Ok(self
            .with_ref(key, |hash: &HashMap<Bytes, Bytes>| {
                hash.iter()
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect()
            })?
            .unwrap_or_default())
    }

    pub fn hkeys(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        Ok(self
            .with_ref(key, |hash: &HashMap<Bytes, Bytes>| hash.keys().cloned().collect())?
            .unwrap_or_default())
    }

    pub fn hvals(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        Ok(self
            .with_ref(key, |hash: &HashMap<Bytes, Bytes>| hash.values().cloned().collect())?
            .unwrap_or_default())
    }

    /// Adds `delta` to an integer hash field, treating absent as 0.
    pub fn hincr_by(&self, key: &Bytes, field: Bytes, delta: i64) -> StoreResult<i64> {
        let value = self.with_mut(key, true, |hash: &mut HashMap<Bytes, Bytes>| {
            let current = match hash.get(&field) {
                Some(data) => parse_i64(data).ok_or(StoreError::HashNotInteger)?,
                None => 0,
            };
            let new_value = current.checked_add(delta).ok_or(StoreError::Overflow)?;
            hash.insert(field, Bytes::from(new_value.to_string()));
            Ok(new_value)
        })?;
        Ok(value.unwrap_or(0))
    }

    // ========================================================================
    // SET OPERATIONS
    // ========================================================================

    /// Adds members. Returns how many were not already present.
    pub fn sadd(&self, key: &Bytes, members: Vec<Bytes>) -> StoreResult<usize> {
        let added = self.with_mut(key, true, |set: &mut HashSet<Bytes>| {
            Ok(members.into_iter().filter(|m| set.insert(m.clone())).count())
        })?;
        Ok(added.unwrap_or(0))
    }

    /// Removes members. Returns how many were present.
    pub fn srem(&self, key: &Bytes, members: &[Bytes]) -> StoreResult<usize> {
        let removed = self.with_mut(key, false, |set: &mut HashSet<Bytes>| {
            Ok(members.iter().filter(|m| set.remove(&m[..])).count())
        })?;
        Ok(removed.unwrap_or(0))
    }

    pub fn sismember(&self, key: &[u8], member: &[u8]) -> StoreResult<bool> {
        Ok(self
            .with_ref(key, |set: &HashSet<Bytes>| set.contains(member))?
            .unwrap_or(false))
    }

    /// All members, in no particular order.
    pub fn smembers(&self, key: &[u8]) -> StoreResult<Vec<Bytes>> {
        Ok(self
            .with_ref(key, |set: &HashSet<Bytes>| set.iter().cloned().collect())?
            .unwrap_or_default())
    }

    pub fn scard(&self, key: &[u8]) -> StoreResult<usize> {
        Ok(self
            .with_ref(key, |set: &HashSet<Bytes>| set.len())?
            .unwrap_or(0))
    }
}

/// Converts a possibly negative list index into a position.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { len + index } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Parses a base-10 `i64` in canonical form only: no sign other than a
/// leading `-`, no leading zeros, no `-0`, no whitespace.
pub(crate) fn parse_i64(data: &[u8]) -> Option<i64> {
    let digits = data.strip_prefix(b"-").unwrap_or(data);
    match digits {
        [] => return None,
        [b'0'] if digits.len() != data.len() => return None,
        [b'0', _, ..] => return None,
        _ => {}
    }
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(data).ok()?.parse().ok()
}

/// Database statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of keys currently stored
    pub keys: usize,
    /// Keys with an expiry set
    pub expires: usize,
    /// Total expired keys reclaimed
    pub expired: u64,
}
