//! Key-value traits and the in-memory store.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] ::sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A single buffered write: `Some(value)` sets the key, `None` deletes it.
pub type WriteOp = (Vec<u8>, Option<Vec<u8>>);

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Read half of a key-value store.
pub trait KvRead {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Returns every entry whose key starts with `prefix`, in ascending key
    /// order.
    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Read-write key-value store.
pub trait KvStore: KvRead {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    fn delete(&mut self, key: &[u8]) -> StoreResult<()>;

    /// Applies a group of writes. Backends that can apply them atomically
    /// should override this.
    fn write_batch(&mut self, ops: Vec<WriteOp>) -> StoreResult<()> {
        for (key, value) in ops {
            match value {
                Some(value) => self.set(&key, &value)?,
                None => self.delete(&key)?,
            }
        }
        Ok(())
    }
}

impl<T: KvRead + ?Sized> KvRead for &T {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        (**self).scan_prefix(prefix)
    }
}

impl<T: KvRead + ?Sized> KvRead for &mut T {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        (**self).scan_prefix(prefix)
    }
}

impl<T: KvStore + ?Sized> KvStore for &mut T {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn write_batch(&mut self, ops: Vec<WriteOp>) -> StoreResult<()> {
        (**self).write_batch(ops)
    }
}

// ---------------------------------------------------------------------------
// Typed helpers
// ---------------------------------------------------------------------------

/// Bincode-typed accessors layered over raw bytes.
pub trait TypedKv: KvRead {
    /// Reads and decodes the value under `key`.
    fn get_typed<T: DeserializeOwned>(&self, key: &[u8]) -> StoreResult<Option<T>> {
        match self.get(key)? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Encodes and stores `value` under `key`.
    fn put_typed<T: Serialize>(&mut self, key: &[u8], value: &T) -> StoreResult<()>
    where
        Self: KvStore,
    {
        let bytes = bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.set(key, &bytes)
    }
}

impl<S: KvRead + ?Sized> TypedKv for S {}

/// Decodes a bincode-encoded record.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// MemStore
// ---------------------------------------------------------------------------

/// Ordered in-memory store. The default backend for tests and for embedders
/// that persist state some other way.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvRead for MemStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

impl KvStore for MemStore {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
