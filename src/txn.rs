//! Transactions: a batch of writes against one namespace that either all
//! land or none do.
//!
//! Accumulates calls against one open write handle and commits once at the
//! end, with a nested-begin depth counter: a nested `begin` only bumps the
//! counter, and only the outermost `commit` actually flushes.

use crate::engine::Engine;
use crate::error::{Result, StorageError};
use crate::key::KeyObject;
use crate::value::ValueObject;

enum WriteOp {
    Put(Vec<u8>, Vec<u8>),
    Del(Vec<u8>),
    Merge(Vec<u8>, Vec<u8>),
}

/// A batch of writes against one namespace. Writes are buffered and
/// applied to the engine only when the outermost `commit` runs;
/// `discard` throws the whole batch away regardless of nesting depth.
pub struct Txn<'e> {
    engine: &'e Engine,
    ns: String,
    depth: u32,
    ops: Vec<WriteOp>,
}

impl<'e> Txn<'e> {
    pub(crate) fn new(engine: &'e Engine, ns: &str) -> Self {
        Txn { engine, ns: ns.to_string(), depth: 1, ops: Vec::new() }
    }

    /// Enter a nested transaction scope. Only the counter moves; there is
    /// still exactly one underlying batch.
    pub fn begin(&mut self) {
        self.depth += 1;
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn put(&mut self, key: &KeyObject<'_>, value: &ValueObject<'_>) -> Result<()> {
        let key_bytes = key.encode(true).ok_or_else(|| StorageError::InvalidArgument("invalid key".into()))?;
        self.ops.push(WriteOp::Put(key_bytes, value.encode()));
        Ok(())
    }

    pub fn del(&mut self, key: &KeyObject<'_>) -> Result<()> {
        let key_bytes = key.encode(true).ok_or_else(|| StorageError::InvalidArgument("invalid key".into()))?;
        self.ops.push(WriteOp::Del(key_bytes));
        Ok(())
    }

    pub fn merge(&mut self, key: &KeyObject<'_>, operand: &[u8]) -> Result<()> {
        let key_bytes = key.encode(true).ok_or_else(|| StorageError::InvalidArgument("invalid key".into()))?;
        self.ops.push(WriteOp::Merge(key_bytes, operand.to_vec()));
        Ok(())
    }

    /// Close one nesting level. The batch only reaches the backend once
    /// every `begin` has a matching `commit`.
    pub fn commit(&mut self) -> Result<()> {
        if self.depth == 0 {
            return Err(StorageError::InvalidArgument("commit without a matching begin".into()));
        }
        self.depth -= 1;
        if self.depth == 0 {
            for op in self.ops.drain(..) {
                match op {
                    WriteOp::Put(k, v) => self.engine.put_raw(&self.ns, &k, &v)?,
                    WriteOp::Del(k) => self.engine.del_raw(&self.ns, &k)?,
                    WriteOp::Merge(k, operand) => self.engine.merge_raw(&self.ns, &k, &operand)?,
                }
            }
        }
        Ok(())
    }

    /// Abandon the whole batch, regardless of nesting depth.
    pub fn discard(&mut self) {
        self.ops.clear();
        self.depth = 0;
    }
}

impl Engine {
    pub fn begin_transaction<'e>(&'e self, ns: &str) -> Txn<'e> {
        Txn::new(self, ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Data;
    use crate::key::KeyType;
    use std::borrow::Cow;

    fn ns_tag() -> Data<'static> {
        Data::Bytes(Cow::Owned(b"ns".to_vec()))
    }

    #[test]
    fn nested_begin_only_commits_once_fully_unwound() {
        let engine = Engine::in_memory();
        let key = KeyObject::new(ns_tag(), Data::from("k"), KeyType::String);
        let mut value = ValueObject::new(KeyType::String);
        value.vals = vec![Data::from("v")];

        let mut txn = engine.begin_transaction("db0");
        txn.begin();
        txn.put(&key, &value).unwrap();
        txn.commit().unwrap();
        assert_eq!(txn.depth(), 1);
        assert!(engine.get("db0", &key).unwrap().is_absent(), "inner commit must not flush");

        txn.commit().unwrap();
        assert_eq!(txn.depth(), 0);
        assert!(!engine.get("db0", &key).unwrap().is_absent(), "outer commit flushes the batch");
    }

    #[test]
    fn discard_drops_buffered_writes() {
        let engine = Engine::in_memory();
        let key = KeyObject::new(ns_tag(), Data::from("k"), KeyType::String);
        let value = ValueObject::new(KeyType::String);

        let mut txn = engine.begin_transaction("db0");
        txn.put(&key, &value).unwrap();
        txn.discard();
        txn.commit().unwrap_err();
    }
}
