//! The merge operator: a deferred read-modify-write, applied against
//! whatever value currently sits under a key (or no value at all) without
//! the caller reading it first.
//!
//! The operand wire shape is a `KEY_MERGE`-typed `ValueObject` carrying an
//! op code and its argument; dispatch is adapted from an async
//! write-batching pump into a synchronous function any backend's `merge()`
//! hook can call directly.
//!
//! The op codes below are a representative subset of the full Redis
//! merge-operation catalog; adding one means adding an arm to `apply` and
//! nothing else.

use crate::data::Data;
use crate::error::{Result, StorageError};
use crate::key::KeyType;
use crate::value::ValueObject;

pub const OP_INCR: u16 = 1;
pub const OP_APPEND: u16 = 2;
pub const OP_META_SIZE_DELTA: u16 = 3;

/// Build the wire bytes for a merge operand: a `KEY_MERGE`-typed value
/// whose single element is the operation's argument.
pub fn encode_operation(op: u16, arg: Data<'_>) -> Vec<u8> {
    let mut v = ValueObject::new(KeyType::Merge);
    v.merge_op = op;
    v.vals = vec![arg];
    v.encode()
}

/// Apply one merge operand to `existing` (absent when the key has no
/// current value), returning the new encoded value. Deterministic: same
/// inputs always produce the same output, so replaying a merge log after
/// a crash reaches the same state.
pub fn apply(existing: Option<&[u8]>, operand: &[u8]) -> Result<Vec<u8>> {
    let (op_obj, _) = ValueObject::decode(operand, false)
        .ok_or_else(|| StorageError::Decode("malformed merge operand".into()))?;
    if !matches!(op_obj.value_type, KeyType::Merge) {
        return Err(StorageError::InvalidArgument("merge operand must be KEY_MERGE-typed".into()));
    }
    let existing_buf = existing.unwrap_or(&[]);
    let (mut cur, _) = ValueObject::decode(existing_buf, false)
        .ok_or_else(|| StorageError::Decode("malformed existing value".into()))?;

    match op_obj.merge_op {
        OP_INCR => {
            let delta = op_obj
                .vals
                .first()
                .and_then(Data::as_int)
                .ok_or_else(|| StorageError::InvalidArgument("INCR operand must be an integer".into()))?;
            let base = decode_int_base(&cur)?;
            cur.set_type(KeyType::String);
            cur.vals = vec![Data::Int(base + delta)];
        }
        OP_APPEND => {
            let suffix = op_obj
                .vals
                .first()
                .and_then(Data::as_bytes)
                .ok_or_else(|| StorageError::InvalidArgument("APPEND operand must be a string".into()))?;
            let mut base = cur.vals.first().and_then(Data::as_bytes).map(|b| b.to_vec()).unwrap_or_default();
            base.extend_from_slice(suffix);
            cur.set_type(KeyType::String);
            cur.vals = vec![Data::from(String::from_utf8_lossy(&base).into_owned())];
        }
        OP_META_SIZE_DELTA => {
            let delta = op_obj
                .vals
                .first()
                .and_then(Data::as_int)
                .ok_or_else(|| StorageError::InvalidArgument("META_SIZE_DELTA operand must be an integer".into()))?;
            let mkey = cur.get_mkey_meta();
            let new_size = (mkey.size as i64 + delta).max(0) as u32;
            cur.set_size(new_size);
        }
        other => {
            tracing::warn!(op = other, "rejected merge operand with unknown op code");
            return Err(StorageError::InvalidArgument(format!("unknown merge op code: {other}")));
        }
    }

    Ok(cur.encode())
}

/// INCR's base may already sit in storage as a native `Data::Int` or as a
/// decimal byte string (e.g. a plain `SET counter 10`); a genuinely absent
/// value starts from zero.
fn decode_int_base(cur: &ValueObject<'_>) -> Result<i64> {
    match cur.vals.first() {
        None => Ok(0),
        Some(v) => match v.as_int() {
            Some(i) => Ok(i),
            None => {
                let bytes = v
                    .as_bytes()
                    .ok_or_else(|| StorageError::InvalidArgument("INCR base is not numeric".into()))?;
                std::str::from_utf8(bytes)
                    .ok()
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .ok_or_else(|| StorageError::InvalidArgument("INCR base is not a valid decimal integer".into()))
            }
        },
    }
}
