//! The TTL compaction filter: drops records whose `KEY_META` TTL has
//! elapsed during compaction, rather than paying for an eager background
//! sweep.
//!
//! Modeled on a feature-flagged compaction-filter hook — a backend opts
//! into filter-driven expiry instead of the caller running its own sweep
//! loop. This crate's `OrderedKv` trait has no native compaction-filter
//! hook, so `sweep` drives the same decision from the adapter side: scan,
//! ask the filter, delete what it rejects.

use crate::backend::{KeyRange, OrderedKv};
use crate::error::Result;
use crate::value::ValueObject;

/// Given the current time, decides whether a record is still live.
pub struct CompactionFilter {
    now_ms: i64,
}

impl Default for CompactionFilter {
    fn default() -> Self {
        // Epoch-0 baseline, for tests that want a fixed reference point
        // rather than the wall clock `now()` gives them.
        CompactionFilter { now_ms: 0 }
    }
}

impl CompactionFilter {
    pub fn at(now_ms: i64) -> Self {
        CompactionFilter { now_ms }
    }

    /// A filter stamped from the wall clock, for real compaction runs
    /// rather than tests that want a fixed baseline.
    pub fn now() -> Self {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64;
        CompactionFilter { now_ms }
    }

    /// `true` keeps the record, `false` means the filter would drop it.
    pub fn keep(&self, value_bytes: &[u8]) -> bool {
        match ValueObject::decode_meta(value_bytes) {
            Some(0) => true,
            Some(ttl) => ttl > self.now_ms,
            None => true,
        }
    }

    /// Walk every key in `range` (the whole namespace when `None`) and
    /// delete whatever `keep` rejects.
    pub fn sweep(&self, backend: &dyn OrderedKv, range: Option<KeyRange>) -> Result<u64> {
        let range = range.unwrap_or(KeyRange { start: Vec::new(), end: None });
        let expired: Vec<Vec<u8>> = backend
            .scan(range)?
            .filter(|(_, v)| !self.keep(v))
            .map(|(k, _)| k)
            .collect();
        let count = expired.len() as u64;
        for key in expired {
            backend.del(&key)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mem::MemKv;
    use crate::key::KeyType;

    #[test]
    fn keeps_records_with_no_ttl() {
        let v = ValueObject::new(KeyType::String);
        let filter = CompactionFilter::at(1_000);
        assert!(filter.keep(&v.encode()));
    }

    #[test]
    fn drops_records_past_their_ttl() {
        let mut v = ValueObject::new(KeyType::String);
        v.set_ttl(500);
        let filter = CompactionFilter::at(1_000);
        assert!(!filter.keep(&v.encode()));
    }

    #[test]
    fn keeps_records_not_yet_expired() {
        let mut v = ValueObject::new(KeyType::String);
        v.set_ttl(5_000);
        let filter = CompactionFilter::at(1_000);
        assert!(filter.keep(&v.encode()));
    }

    #[test]
    fn sweep_deletes_only_expired_keys() {
        let kv = MemKv::new();
        let mut live = ValueObject::new(KeyType::String);
        live.set_ttl(5_000);
        let mut dead = ValueObject::new(KeyType::String);
        dead.set_ttl(500);

        kv.put(b"live", &live.encode()).unwrap();
        kv.put(b"dead", &dead.encode()).unwrap();

        let removed = CompactionFilter::at(1_000).sweep(&kv, None).unwrap();
        assert_eq!(removed, 1);
        assert!(kv.get(b"live").unwrap().is_some());
        assert!(kv.get(b"dead").unwrap().is_none());
    }
}
