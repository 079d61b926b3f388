//! A namespace-scoped, bidirectional cursor over the key codec.
//!
//! Modeled on a `Valid`/`Next`/`Prev`/`Jump`-style cursor with cached,
//! lazily-decoded key/value accessors at the current position. Holds an
//! `Arc<dyn OrderedKv>` rather than a borrow of the namespace map so
//! dropping the namespace out of the engine (`Engine::drop_namespace`)
//! cannot invalidate an iterator already in flight.

use std::sync::Arc;

use crate::backend::{KeyRange, OrderedKv};
use crate::data::Data;
use crate::error::Result;
use crate::key::KeyObject;
use crate::value::ValueObject;

/// One step of a scan: the raw encoded key plus a lazily-decoded value.
pub struct Entry {
    pub key_bytes: Vec<u8>,
    pub value_bytes: Vec<u8>,
}

impl Entry {
    pub fn decode_value<'a>(&'a self) -> Option<ValueObject<'a>> {
        ValueObject::decode(&self.value_bytes, false).map(|(v, _)| v)
    }

    pub fn decode_key<'a>(&'a self, ns: Data<'a>) -> Option<KeyObject<'a>> {
        KeyObject::decode(&self.key_bytes, ns, false).map(|(k, _)| k)
    }
}

/// A bidirectional cursor over one namespace's key range, snapshotting at
/// construction time (the `OrderedKv::scan` contract) rather than tracking
/// live mutations — a write that happens after `Iter::new` simply isn't
/// observed by entries already buffered.
///
/// `position == entries.len()` (or, symmetrically, running `prev()` off the
/// front) is the single "invalid" state; every other position names a live
/// entry reachable through `key`/`value`/`raw_key`/`raw_value`.
pub struct Iter {
    backend: Arc<dyn OrderedKv>,
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    position: usize,
}

impl Iter {
    pub fn new(backend: Arc<dyn OrderedKv>, range: KeyRange) -> Result<Self> {
        let entries: Vec<(Vec<u8>, Vec<u8>)> = backend.scan(range)?.collect();
        Ok(Iter { backend, entries, position: 0 })
    }

    /// A prefix-bounded scan: every key starting with `prefix.encode_prefix()`.
    pub fn over_key_prefix(backend: Arc<dyn OrderedKv>, prefix: &KeyObject<'_>) -> Result<Self> {
        let mut start = Vec::new();
        prefix.encode_prefix(&mut start);
        let mut end = start.clone();
        bump(&mut end);
        Iter::new(backend, KeyRange { start, end: if end.is_empty() { None } else { Some(end) } })
    }

    pub fn valid(&self) -> bool {
        self.position < self.entries.len()
    }

    /// Advance past the current entry, returning what was at the old
    /// position (or `None` once already invalid).
    pub fn next(&mut self) -> Option<Entry> {
        if !self.valid() {
            return None;
        }
        let (key_bytes, value_bytes) = self.entries[self.position].clone();
        self.position += 1;
        Some(Entry { key_bytes, value_bytes })
    }

    /// Step the cursor back one position; becomes invalid when stepping
    /// back off the first entry.
    pub fn prev(&mut self) {
        match self.position.checked_sub(1) {
            Some(p) => self.position = p,
            None => self.position = self.entries.len(),
        }
    }

    /// Seek to the first entry whose encoded key is `>= target`.
    pub fn jump(&mut self, target: &KeyObject<'_>) -> Result<()> {
        let target_bytes = target
            .encode(true)
            .ok_or_else(|| crate::error::StorageError::InvalidArgument("invalid jump target key".into()))?;
        self.position = self.entries.partition_point(|(k, _)| k.as_slice() < target_bytes.as_slice());
        Ok(())
    }

    pub fn jump_to_first(&mut self) {
        self.position = 0;
    }

    pub fn jump_to_last(&mut self) {
        self.position = self.entries.len().saturating_sub(1);
        if self.entries.is_empty() {
            self.position = 0;
        }
    }

    /// The raw encoded key at the current position.
    pub fn raw_key(&self) -> Option<&[u8]> {
        self.entries.get(self.position).map(|(k, _)| k.as_slice())
    }

    /// The raw encoded value at the current position.
    pub fn raw_value(&self) -> Option<&[u8]> {
        self.entries.get(self.position).map(|(_, v)| v.as_slice())
    }

    /// Decode the key at the current position into `ns`'s namespace.
    pub fn key<'a>(&'a self, ns: Data<'a>) -> Option<KeyObject<'a>> {
        KeyObject::decode(self.raw_key()?, ns, true).map(|(k, _)| k)
    }

    /// Decode the value at the current position.
    pub fn value<'a>(&'a self) -> Option<ValueObject<'a>> {
        ValueObject::decode(self.raw_value()?, true).map(|(v, _)| v)
    }

    /// Keep the backend alive for as long as the iterator exists, even if
    /// the engine's namespace map no longer references it.
    pub fn backend(&self) -> &Arc<dyn OrderedKv> {
        &self.backend
    }
}

fn bump(prefix: &mut Vec<u8>) {
    while let Some(last) = prefix.last_mut() {
        if *last == 0xff {
            prefix.pop();
        } else {
            *last += 1;
            return;
        }
    }
}
