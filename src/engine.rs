//! The engine adapter: routes key/value codec objects to a namespace-scoped
//! `OrderedKv`, and owns the namespace → backend map every other operation
//! goes through.
//!
//! Generalized from a fixed-table handle map (one handle per logical
//! table, opened once and looked up by name) and a `RocksDBEngine`-style
//! method set (`Put`/`Get`/`MultiGet`/`Del`/`Merge`/`Exists`/`Compact`/
//! `Find`/`ListNameSpaces`/`DropNameSpace`/`EstimateKeysNum`), from a fixed
//! set of tables opened at startup to namespaces created on demand.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::backend::{KeyRange, OrderedKv};
use crate::compaction::CompactionFilter;
use crate::data::Data;
use crate::error::{Result, StorageError};
use crate::key::KeyObject;
use crate::value::ValueObject;

/// Tuning knobs the adapter itself understands; backend-specific tuning
/// (page size, LSM compaction strategy, …) stays out of scope and lives in
/// whatever options type the concrete `OrderedKv` impl exposes.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// Silently create a namespace on first write instead of erroring.
    pub create_namespace_if_missing: bool,
    /// Applied as a `CompactionFilter` during `compact()`.
    pub ttl_sweep_enabled: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions { create_namespace_if_missing: true, ttl_sweep_enabled: true }
    }
}

type NamespaceFactory = dyn Fn(&str) -> Result<Arc<dyn OrderedKv>> + Send + Sync;

/// Owns one `OrderedKv` per namespace and dispatches codec-level
/// operations to it. Namespaces are created lazily via `factory` the
/// first time they're touched.
pub struct Engine {
    namespaces: RwLock<HashMap<String, Arc<dyn OrderedKv>>>,
    factory: Box<NamespaceFactory>,
    options: EngineOptions,
}

impl Engine {
    pub fn new(options: EngineOptions, factory: Box<NamespaceFactory>) -> Self {
        Engine { namespaces: RwLock::new(HashMap::new()), factory, options }
    }

    /// An engine backed entirely by in-memory namespaces, for tests.
    pub fn in_memory() -> Self {
        Engine::new(
            EngineOptions::default(),
            Box::new(|_ns| Ok(Arc::new(crate::backend::mem::MemKv::new()) as Arc<dyn OrderedKv>)),
        )
    }

    fn namespace(&self, ns: &str) -> Result<Arc<dyn OrderedKv>> {
        if let Some(existing) = self.namespaces.read().unwrap().get(ns) {
            return Ok(Arc::clone(existing));
        }
        if !self.options.create_namespace_if_missing {
            return Err(StorageError::NamespaceNotFound(ns.to_string()));
        }
        let mut guard = self.namespaces.write().unwrap();
        // Another writer may have created it while we waited for the lock.
        if let Some(existing) = guard.get(ns) {
            return Ok(Arc::clone(existing));
        }
        let backend = (self.factory)(ns)?;
        tracing::debug!(namespace = ns, "opened namespace");
        guard.insert(ns.to_string(), Arc::clone(&backend));
        Ok(backend)
    }

    pub fn list_namespaces(&self) -> Vec<String> {
        self.namespaces.read().unwrap().keys().cloned().collect()
    }

    /// Drop a namespace's handle from the map. Any `Arc` clone already
    /// held by a live iterator keeps the backend alive until that
    /// iterator is itself dropped.
    pub fn drop_namespace(&self, ns: &str) -> Result<()> {
        self.namespaces.write().unwrap().remove(ns);
        tracing::info!(namespace = ns, "dropped namespace");
        Ok(())
    }

    pub fn put(&self, ns: &str, key: &KeyObject<'_>, value: &ValueObject<'_>) -> Result<()> {
        let backend = self.namespace(ns)?;
        let key_bytes = key.encode(true).ok_or_else(|| StorageError::InvalidArgument("invalid key".into()))?;
        backend.put(&key_bytes, &value.encode())
    }

    /// Write already-encoded bytes directly, bypassing codec validation —
    /// used by callers replaying a write-ahead log.
    pub fn put_raw(&self, ns: &str, key_bytes: &[u8], value_bytes: &[u8]) -> Result<()> {
        self.namespace(ns)?.put(key_bytes, value_bytes)
    }

    /// Decoded value, or the empty `type == 0` sentinel on a miss, rather
    /// than an `Option` — a miss and a genuinely empty `KEY_META` record
    /// are deliberately the same shape on the wire.
    pub fn get<'a>(&self, ns: &str, key: &KeyObject<'_>) -> Result<ValueObject<'a>> {
        let backend = self.namespace(ns)?;
        let key_bytes = key.encode(true).ok_or_else(|| StorageError::InvalidArgument("invalid key".into()))?;
        match backend.get(&key_bytes)? {
            None => Ok(ValueObject { value_type: crate::key::KeyType::Meta, merge_op: 0, vals: Vec::new() }),
            Some(bytes) => {
                let (value, _) = ValueObject::decode(&bytes, true)
                    .ok_or_else(|| StorageError::Decode("malformed value record".into()))?;
                let vals = value.vals.into_iter().map(Data::into_owned).collect();
                Ok(ValueObject { value_type: value.value_type, merge_op: value.merge_op, vals })
            }
        }
    }

    /// Per-key results and per-key errors side by side, so one malformed
    /// record doesn't fail the whole batch.
    pub fn multi_get<'a>(&self, ns: &str, keys: &[KeyObject<'_>]) -> Vec<Result<ValueObject<'a>>> {
        keys.iter().map(|k| self.get(ns, k)).collect()
    }

    pub fn del(&self, ns: &str, key: &KeyObject<'_>) -> Result<()> {
        let backend = self.namespace(ns)?;
        let key_bytes = key.encode(true).ok_or_else(|| StorageError::InvalidArgument("invalid key".into()))?;
        backend.del(&key_bytes)
    }

    /// Delete by already-encoded key bytes, bypassing codec validation.
    pub fn del_raw(&self, ns: &str, key_bytes: &[u8]) -> Result<()> {
        self.namespace(ns)?.del(key_bytes)
    }

    /// Apply a merge operand by already-encoded key bytes.
    pub fn merge_raw(&self, ns: &str, key_bytes: &[u8], operand: &[u8]) -> Result<()> {
        self.namespace(ns)?.merge(key_bytes, operand)
    }

    pub fn exists(&self, ns: &str, key: &KeyObject<'_>) -> Result<bool> {
        let backend = self.namespace(ns)?;
        let key_bytes = key.encode(true).ok_or_else(|| StorageError::InvalidArgument("invalid key".into()))?;
        backend.exists(&key_bytes)
    }

    /// Apply a merge operand to whatever is currently under `key`.
    pub fn merge(&self, ns: &str, key: &KeyObject<'_>, operand: &[u8]) -> Result<()> {
        let backend = self.namespace(ns)?;
        let key_bytes = key.encode(true).ok_or_else(|| StorageError::InvalidArgument("invalid key".into()))?;
        backend.merge(&key_bytes, operand)
    }

    pub fn estimate_keys_num(&self, ns: &str) -> Result<u64> {
        self.namespace(ns)?.estimate_keys_num()
    }

    /// An iterator positioned at the first record at or after `prefix` in
    /// `prefix`'s namespace, bounded to keys sharing `prefix.encode_prefix()`.
    pub fn find(&self, ns: &str, prefix: &KeyObject<'_>) -> Result<crate::iter::Iter> {
        let backend = self.namespace(ns)?;
        crate::iter::Iter::over_key_prefix(backend, prefix)
    }

    /// Compact the range between two bounding keys. `end` is exclusive,
    /// matching `KeyRange`'s convention.
    pub fn compact(&self, ns: &str, start: &KeyObject<'_>, end: &KeyObject<'_>) -> Result<()> {
        let backend = self.namespace(ns)?;
        let start_bytes =
            start.encode(true).ok_or_else(|| StorageError::InvalidArgument("invalid key".into()))?;
        let end_bytes =
            end.encode(true).ok_or_else(|| StorageError::InvalidArgument("invalid key".into()))?;
        let range = KeyRange { start: start_bytes, end: Some(end_bytes) };
        if self.options.ttl_sweep_enabled {
            let swept = CompactionFilter::now().sweep(backend.as_ref(), Some(range.clone()))?;
            tracing::info!(namespace = ns, swept, "ttl compaction filter ran");
        }
        backend.compact(Some(range))
    }

    /// Compact the whole namespace, for callers with no natural range to
    /// bound (e.g. scheduled housekeeping).
    pub fn compact_all(&self, ns: &str) -> Result<()> {
        let backend = self.namespace(ns)?;
        if self.options.ttl_sweep_enabled {
            let swept = CompactionFilter::now().sweep(backend.as_ref(), None)?;
            tracing::info!(namespace = ns, swept, "ttl compaction filter ran");
        }
        backend.compact(None)
    }
}
