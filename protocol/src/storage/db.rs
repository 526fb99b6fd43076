//! # SledStore — Persistent Storage Backend
//!
//! A [`KvStore`] over a single named sled tree. sled keeps keys in
//! lexicographic order, which is exactly what `scan_prefix` promises, so
//! range scans over engine indexes work without extra sorting.
//!
//! ## Atomicity
//!
//! [`KvStore::write_batch`] is overridden to apply every write in one sled
//! `Batch`. A committed engine transaction either lands on disk completely
//! or not at all.

use std::path::Path;

use sled::{Batch, Db, Tree};

use super::kv::{KvRead, KvStore, StoreResult, WriteOp};

/// Name of the sled tree holding basket state.
const DEFAULT_TREE: &str = "basket_state";

/// Persistent key-value store backed by sled.
///
/// Cloning is cheap and clones share the same underlying database.
#[derive(Debug, Clone)]
pub struct SledStore {
    /// The underlying sled database handle.
    db: Db,
    /// Tree all keys are written into.
    tree: Tree,
}

impl SledStore {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let tree = db.open_tree(DEFAULT_TREE)?;
        Ok(Self { db, tree })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl KvRead for SledStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|value| value.to_vec()))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries = Vec::new();
        for item in self.tree.scan_prefix(prefix) {
            let (key, value) = item?;
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}

impl KvStore for SledStore {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.tree.insert(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.tree.remove(key)?;
        Ok(())
    }

    fn write_batch(&mut self, ops: Vec<WriteOp>) -> StoreResult<()> {
        let mut batch = Batch::default();
        for (key, value) in ops {
            match value {
                Some(value) => batch.insert(key, value),
                None => batch.remove(key),
            }
        }
        self.tree.apply_batch(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_store_round_trip() {
        let mut store = SledStore::open_temporary().unwrap();
        store.set(b"k", b"v").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        store.delete(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
    }

    #[test]
    fn batch_and_prefix_scan() {
        let mut store = SledStore::open_temporary().unwrap();
        store
            .write_batch(vec![
                (b"x/2".to_vec(), Some(b"b".to_vec())),
                (b"x/1".to_vec(), Some(b"a".to_vec())),
                (b"y/1".to_vec(), Some(b"c".to_vec())),
            ])
            .unwrap();

        let entries = store.scan_prefix(b"x/").unwrap();
        assert_eq!(
            entries,
            vec![
                (b"x/1".to_vec(), b"a".to_vec()),
                (b"x/2".to_vec(), b"b".to_vec()),
            ]
        );
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = SledStore::open(dir.path()).unwrap();
            store.set(b"persist", b"yes").unwrap();
            store.flush().unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(store.get(b"persist").unwrap(), Some(b"yes".to_vec()));
    }
}
