//! Durable key-value storage for serialized face databases.
//!
//! A face database is persisted as a single text blob under one key, so the
//! interface is deliberately small: string keys, string values. Two
//! implementations are provided:
//!
//! - [`MemoryStore`]: in-memory, for tests and ephemeral sessions
//! - [`RedbStore`]: on-disk, backed by redb

pub mod memory;
pub mod redb;

use std::fmt;
use thiserror::Error;

/// Errors that can occur in KV store operations.
#[derive(Error, Debug)]
pub enum KVError {
    #[error("kv: storage error: {0}")]
    Storage(String),
}

/// Result type for KV operations.
pub type KVResult<T> = Result<T, KVError>;

/// String key-value store.
///
/// Implementations must be safe for concurrent use.
pub trait KVStore: Send + Sync {
    /// Get the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> KVResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> KVResult<()>;

    /// Delete a key. No error if the key does not exist.
    fn delete(&self, key: &str) -> KVResult<()>;

    /// Return the size in bytes of the value stored under `key`.
    fn size_of(&self, key: &str) -> KVResult<Option<u64>> {
        Ok(self.get(key)?.map(|v| v.len() as u64))
    }
}

impl fmt::Debug for dyn KVStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KVStore {{ ... }}")
    }
}

pub use memory::MemoryStore;
pub use redb::RedbStore;
