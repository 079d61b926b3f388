//! The ordered-KV backend contract: a minimal trait every namespace-scoped
//! storage engine must satisfy, plus a `BTreeMap`-backed implementation
//! used by this crate's own tests.
//!
//! Generalized from a single environment handle paired with one database
//! per logical table, so the adapter in `engine.rs` is written against
//! this trait rather than hard-wired to one engine, with `backend_heed`
//! supplying the concrete production implementation.

use crate::error::Result;

/// One ordered key range, inclusive of `start`, exclusive of `end` when
/// `end` is `Some`; `None` means "through the end of the namespace".
#[derive(Clone, Debug)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

/// A single ordered key-value namespace (one column family / one
/// `heed::Database`), plus the write-batch a transaction accumulates.
pub trait OrderedKv: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn multi_get(&self, keys: &[&[u8]]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn del(&self, key: &[u8]) -> Result<()>;

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterate `range` in ascending key order, yielding owned copies so the
    /// iterator doesn't outlive a single backend call.
    fn scan(&self, range: KeyRange) -> Result<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>>;

    fn estimate_keys_num(&self) -> Result<u64>;

    /// Merge is a deferred read-modify-write; backends without a native
    /// merge operator fall back to read-then-write, which `merge.rs`
    /// dispatches through regardless of which path ran.
    fn merge(&self, key: &[u8], operand: &[u8]) -> Result<()>;

    /// Best-effort housekeeping hook over `range` (the whole namespace when
    /// `None`); backends without a compaction concept may treat this as a
    /// no-op.
    fn compact(&self, range: Option<KeyRange>) -> Result<()>;
}

/// An in-memory, `BTreeMap`-backed `OrderedKv` namespace. Not behind a
/// feature flag: every codec and engine test in this crate runs against
/// it so the suite has no dependency on an installed LMDB-compatible
/// backend.
pub mod mem {
    use super::{KeyRange, OrderedKv};
    use crate::error::Result;
    use std::collections::BTreeMap;
    use std::sync::RwLock;

    #[derive(Default)]
    pub struct MemKv {
        data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    }

    impl MemKv {
        pub fn new() -> Self {
            MemKv::default()
        }
    }

    impl OrderedKv for MemKv {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            Ok(self.data.read().unwrap().get(key).cloned())
        }

        fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
            self.data.write().unwrap().insert(key.to_vec(), value.to_vec());
            Ok(())
        }

        fn del(&self, key: &[u8]) -> Result<()> {
            self.data.write().unwrap().remove(key);
            Ok(())
        }

        fn scan(&self, range: KeyRange) -> Result<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>> {
            let snapshot: Vec<(Vec<u8>, Vec<u8>)> = {
                let guard = self.data.read().unwrap();
                let iter = guard.range(range.start.clone()..);
                match &range.end {
                    Some(end) => iter.take_while(|(k, _)| *k < end).map(|(k, v)| (k.clone(), v.clone())).collect(),
                    None => iter.map(|(k, v)| (k.clone(), v.clone())).collect(),
                }
            };
            Ok(Box::new(snapshot.into_iter()))
        }

        fn estimate_keys_num(&self) -> Result<u64> {
            Ok(self.data.read().unwrap().len() as u64)
        }

        fn merge(&self, key: &[u8], operand: &[u8]) -> Result<()> {
            let mut guard = self.data.write().unwrap();
            let merged = crate::merge::apply(guard.get(key.as_ref()).map(|v| v.as_slice()), operand)?;
            guard.insert(key.to_vec(), merged);
            Ok(())
        }

        fn compact(&self, _range: Option<KeyRange>) -> Result<()> {
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn put_get_del_roundtrip() {
            let kv = MemKv::new();
            kv.put(b"a", b"1").unwrap();
            assert_eq!(kv.get(b"a").unwrap(), Some(b"1".to_vec()));
            kv.del(b"a").unwrap();
            assert_eq!(kv.get(b"a").unwrap(), None);
        }

        #[test]
        fn scan_respects_bounded_range() {
            let kv = MemKv::new();
            for k in [b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()] {
                kv.put(&k, b"v").unwrap();
            }
            let range = KeyRange { start: b"b".to_vec(), end: Some(b"d".to_vec()) };
            let keys: Vec<Vec<u8>> = kv.scan(range).unwrap().map(|(k, _)| k).collect();
            assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
        }

        #[test]
        fn scan_unbounded_end_reaches_last_key() {
            let kv = MemKv::new();
            for k in [b"a".to_vec(), b"b".to_vec()] {
                kv.put(&k, b"v").unwrap();
            }
            let range = KeyRange { start: b"a".to_vec(), end: None };
            let keys: Vec<Vec<u8>> = kv.scan(range).unwrap().map(|(k, _)| k).collect();
            assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
        }
    }
}
