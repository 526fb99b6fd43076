//! # CacheStore — Buffered Transaction Overlay
//!
//! Wraps a store and holds every write in memory. Reads see the buffered
//! writes layered over the backend. [`CacheStore::commit`] flushes the
//! buffer through [`KvStore::write_batch`]; dropping the cache discards it.

use std::collections::BTreeMap;

use super::kv::{KvRead, KvStore, StoreResult, WriteOp};

/// Write buffer over a backing store.
pub struct CacheStore<'a, S: KvStore + ?Sized> {
    inner: &'a mut S,
    /// Pending writes; `None` marks a delete.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: KvStore + ?Sized> CacheStore<'a, S> {
    pub fn new(inner: &'a mut S) -> Self {
        Self {
            inner,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes.
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Applies every buffered write to the backing store.
    pub fn commit(self) -> StoreResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let ops: Vec<WriteOp> = self.writes.into_iter().collect();
        self.inner.write_batch(ops)
    }
}

impl<S: KvStore + ?Sized> KvRead for CacheStore<'_, S> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.clone()),
            None => self.inner.get(key),
        }
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.inner.scan_prefix(prefix)?.into_iter().collect();

        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}

impl<S: KvStore + ?Sized> KvStore for CacheStore<'_, S> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }
}
