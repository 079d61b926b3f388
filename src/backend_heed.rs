//! The production `OrderedKv` implementation, backed by `heed` (LMDB).
//!
//! LMDB has no compaction or native merge-operator concept, so `compact()`
//! is a no-op and `merge()` falls back to the read-modify-write
//! `crate::merge::apply` path documented on `OrderedKv::merge`.

use std::ops::Bound;
use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::backend::{KeyRange, OrderedKv};
use crate::error::{Result, StorageError};

/// Sized generously rather than exposed as separate public knobs; exact
/// LSM tuning is out of scope for this adapter layer.
#[derive(Clone, Copy, Debug)]
pub struct HeedOptions {
    pub map_size: usize,
    pub max_dbs: u32,
}

impl Default for HeedOptions {
    fn default() -> Self {
        HeedOptions { map_size: 1 << 30, max_dbs: 64 }
    }
}

pub struct HeedKv {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl HeedKv {
    /// Open (creating if absent) one `heed::Database` named `namespace`
    /// inside the environment rooted at `path`.
    pub fn open(path: &Path, namespace: &str, options: HeedOptions) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(StorageError::backend)?;
        // SAFETY: the caller is responsible for ensuring no other process
        // opens this same environment path concurrently, per LMDB's
        // single-writer-environment requirement.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(options.map_size)
                .max_dbs(options.max_dbs)
                .open(path)
                .map_err(StorageError::backend)?
        };
        let mut wtxn = env.write_txn().map_err(StorageError::backend)?;
        let db = env
            .create_database(&mut wtxn, Some(namespace))
            .map_err(StorageError::backend)?;
        wtxn.commit().map_err(StorageError::backend)?;
        tracing::info!(namespace, path = %path.display(), "opened heed-backed namespace");
        Ok(HeedKv { env, db })
    }
}

impl OrderedKv for HeedKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let rtxn = self.env.read_txn().map_err(StorageError::backend)?;
        Ok(self.db.get(&rtxn, key).map_err(StorageError::backend)?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut wtxn = self.env.write_txn().map_err(StorageError::backend)?;
        self.db.put(&mut wtxn, key, value).map_err(StorageError::backend)?;
        wtxn.commit().map_err(StorageError::backend)
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        let mut wtxn = self.env.write_txn().map_err(StorageError::backend)?;
        self.db.delete(&mut wtxn, key).map_err(StorageError::backend)?;
        wtxn.commit().map_err(StorageError::backend)
    }

    fn scan(&self, range: KeyRange) -> Result<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>> {
        let rtxn = self.env.read_txn().map_err(StorageError::backend)?;
        let mut collected = Vec::new();
        let iter = self
            .db
            .range(
                &rtxn,
                &(Bound::Included(range.start.as_slice()), Bound::<&[u8]>::Unbounded),
            )
            .map_err(StorageError::backend)?;
        for item in iter {
            let (k, v) = item.map_err(StorageError::backend)?;
            if let Some(end) = &range.end {
                if k >= end.as_slice() {
                    break;
                }
            }
            collected.push((k.to_vec(), v.to_vec()));
        }
        Ok(Box::new(collected.into_iter()))
    }

    fn estimate_keys_num(&self) -> Result<u64> {
        let rtxn = self.env.read_txn().map_err(StorageError::backend)?;
        Ok(self.db.len(&rtxn).map_err(StorageError::backend)?)
    }

    fn merge(&self, key: &[u8], operand: &[u8]) -> Result<()> {
        let existing = self.get(key)?;
        let merged = crate::merge::apply(existing.as_deref(), operand)?;
        self.put(key, &merged)
    }

    fn compact(&self, _range: Option<KeyRange>) -> Result<()> {
        Ok(())
    }
}
