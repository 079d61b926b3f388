//! The value codec: the payload stored under a key, plus the metadata
//! overlays (`KEY_META` values) collections use to track size, TTL and
//! cached range bounds without a full scan.
//!
//! Rather than a `memcpy`'d struct overlay onto a byte buffer, the meta
//! fields are encoded as ordinary self-delimiting `Data` elements at fixed
//! positions in `vals`, reusing the same codec as everything else.

use crate::data::Data;
use crate::key::KeyType;

/// Fixed `vals` positions shared by every `KEY_META` value.
mod slot {
    pub const TTL: usize = 0;
    pub const MIN: usize = 1;
    pub const MAX: usize = 2;
    pub const SIZE: usize = 3;
    pub const LEFT_INDEX: usize = 4;
    pub const RIGHT_INDEX: usize = 5;
}

/// TTL and cached min/max bounds common to every meta value.
#[derive(Clone, Debug, PartialEq)]
pub struct Meta {
    /// Unix-epoch milliseconds; `0` means no expiry.
    pub ttl: i64,
    pub min_data: Option<Data<'static>>,
    pub max_data: Option<Data<'static>>,
}

/// Meta for a sized collection (hash, set, zset): adds an element count.
#[derive(Clone, Debug, PartialEq)]
pub struct MKeyMeta {
    pub meta: Meta,
    pub size: u32,
}

/// Meta for a list: adds the size plus the live `[left_index, right_index)`
/// window a list keeps so push/pop at either end stays O(1).
#[derive(Clone, Debug, PartialEq)]
pub struct ListMeta {
    pub meta: Meta,
    pub size: u32,
    pub left_index: i64,
    pub right_index: i64,
}

/// A value: the type it belongs to, a merge-operation code (meaningful
/// only when `value_type == KeyType::Merge`), and its payload elements.
#[derive(Clone, Debug)]
pub struct ValueObject<'a> {
    pub value_type: KeyType,
    pub merge_op: u16,
    pub vals: Vec<Data<'a>>,
}

impl<'a> ValueObject<'a> {
    pub fn new(value_type: KeyType) -> Self {
        let mut v = ValueObject { value_type, merge_op: 0, vals: Vec::new() };
        v.set_type(value_type);
        v
    }

    /// Change the value's type, eagerly reserving the meta slots that type
    /// requires so accessors never have to special-case a short `vals`.
    pub fn set_type(&mut self, value_type: KeyType) {
        self.value_type = value_type;
        let min_len = match value_type {
            KeyType::Meta => 3,
            KeyType::Hash | KeyType::Set | KeyType::ZSet => 4,
            KeyType::List => 6,
            _ => self.vals.len(),
        };
        if self.vals.len() < min_len {
            self.vals.resize(min_len, Data::Nil);
        }
    }

    fn get_slot(&self, i: usize) -> Data<'static> {
        self.vals.get(i).cloned().map(|d| d.into_owned()).unwrap_or(Data::Nil)
    }

    /// True for the empty-buffer sentinel value `Get` returns on a miss:
    /// an empty payload decodes to `type == 0`.
    pub fn is_absent(&self) -> bool {
        matches!(self.value_type, KeyType::Meta) && self.vals.is_empty() && self.merge_op == 0
    }

    pub fn get_ttl(&self) -> i64 {
        self.vals.get(slot::TTL).and_then(Data::as_int).unwrap_or(0)
    }

    pub fn set_ttl(&mut self, ttl: i64) {
        if self.vals.len() <= slot::TTL {
            self.vals.resize(slot::TTL + 1, Data::Nil);
        }
        self.vals[slot::TTL] = Data::Int(ttl);
    }

    pub fn get_meta(&self) -> Meta {
        let min = self.get_slot(slot::MIN);
        let max = self.get_slot(slot::MAX);
        Meta {
            ttl: self.get_ttl(),
            min_data: if min.is_nil() { None } else { Some(min) },
            max_data: if max.is_nil() { None } else { Some(max) },
        }
    }

    fn get_size(&self) -> u32 {
        self.vals.get(slot::SIZE).and_then(Data::as_int).unwrap_or(0) as u32
    }

    pub fn get_mkey_meta(&self) -> MKeyMeta {
        MKeyMeta { meta: self.get_meta(), size: self.get_size() }
    }

    pub fn get_hash_meta(&self) -> MKeyMeta {
        self.get_mkey_meta()
    }

    pub fn get_set_meta(&self) -> MKeyMeta {
        self.get_mkey_meta()
    }

    pub fn get_zset_meta(&self) -> MKeyMeta {
        self.get_mkey_meta()
    }

    pub fn get_list_meta(&self) -> ListMeta {
        ListMeta {
            meta: self.get_meta(),
            size: self.get_size(),
            left_index: self.vals.get(slot::LEFT_INDEX).and_then(Data::as_int).unwrap_or(0),
            right_index: self.vals.get(slot::RIGHT_INDEX).and_then(Data::as_int).unwrap_or(0),
        }
    }

    pub fn set_size(&mut self, size: u32) {
        if self.vals.len() <= slot::SIZE {
            self.vals.resize(slot::SIZE + 1, Data::Nil);
        }
        self.vals[slot::SIZE] = Data::Int(size as i64);
    }

    pub fn set_list_bounds(&mut self, left_index: i64, right_index: i64) {
        if self.vals.len() <= slot::RIGHT_INDEX {
            self.vals.resize(slot::RIGHT_INDEX + 1, Data::Nil);
        }
        self.vals[slot::LEFT_INDEX] = Data::Int(left_index);
        self.vals[slot::RIGHT_INDEX] = Data::Int(right_index);
    }

    pub fn set_min_data(&mut self, min: Data<'a>) {
        if self.vals.len() <= slot::MIN {
            self.vals.resize(slot::MIN + 1, Data::Nil);
        }
        self.vals[slot::MIN] = min;
    }

    pub fn set_max_data(&mut self, max: Data<'a>) {
        if self.vals.len() <= slot::MAX {
            self.vals.resize(slot::MAX + 1, Data::Nil);
        }
        self.vals[slot::MAX] = max;
    }

    pub fn set_min_max_data(&mut self, min: Data<'a>, max: Data<'a>) {
        self.set_min_data(min);
        self.set_max_data(max);
    }

    pub fn clear_min_max_data(&mut self) {
        if self.vals.len() > slot::MIN {
            self.vals[slot::MIN] = Data::Nil;
        }
        if self.vals.len() > slot::MAX {
            self.vals[slot::MAX] = Data::Nil;
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(self.value_type as u8);
        if matches!(self.value_type, KeyType::Merge) {
            buf.extend_from_slice(&self.merge_op.to_be_bytes());
        }
        buf.push(self.vals.len() as u8);
        for v in &self.vals {
            v.encode(&mut buf);
        }
        buf
    }

    /// Decode a full value. An empty buffer is the "no value" sentinel and
    /// decodes as an empty `KEY_META` object rather than failing; a
    /// present-but-empty `vals` array (`vals_count == 0` on a non-empty
    /// buffer) is a distinct, equally valid case.
    pub fn decode(buf: &'a [u8], clone_str: bool) -> Option<(ValueObject<'a>, usize)> {
        if buf.is_empty() {
            return Some((ValueObject { value_type: KeyType::Meta, merge_op: 0, vals: Vec::new() }, 0));
        }
        let type_byte = buf[0];
        let value_type = type_byte_to_key_type(type_byte)?;
        let mut pos = 1;
        let mut merge_op = 0u16;
        if matches!(value_type, KeyType::Merge) {
            let bytes: [u8; 2] = buf.get(pos..pos + 2)?.try_into().ok()?;
            merge_op = u16::from_be_bytes(bytes);
            pos += 2;
        }
        let vals_count = *buf.get(pos)?;
        pos += 1;
        let mut vals = Vec::with_capacity(vals_count as usize);
        for _ in 0..vals_count {
            let (v, used) = Data::decode(&buf[pos..], clone_str)?;
            pos += used;
            vals.push(v);
        }
        Some((ValueObject { value_type, merge_op, vals }, pos))
    }

    /// Decode only the TTL slot without parsing the rest of `vals`, for
    /// callers (the compaction filter) that only need to know whether a
    /// record has expired.
    pub fn decode_meta(buf: &'a [u8]) -> Option<i64> {
        if buf.is_empty() {
            return Some(0);
        }
        let type_byte = buf[0];
        let value_type = type_byte_to_key_type(type_byte)?;
        let mut pos = 1;
        if matches!(value_type, KeyType::Merge) {
            pos += 2;
        }
        let vals_count = *buf.get(pos)?;
        pos += 1;
        if vals_count == 0 {
            return Some(0);
        }
        let (ttl, _) = Data::decode(&buf[pos..], false)?;
        Some(ttl.as_int().unwrap_or(0))
    }
}

fn type_byte_to_key_type(b: u8) -> Option<KeyType> {
    Some(match b {
        0 => KeyType::Meta,
        1 => KeyType::String,
        2 => KeyType::Hash,
        3 => KeyType::List,
        4 => KeyType::Set,
        5 => KeyType::ZSet,
        6 => KeyType::HashField,
        7 => KeyType::ListElement,
        8 => KeyType::SetMember,
        9 => KeyType::ZSetScore,
        10 => KeyType::ZSetSort,
        11 => KeyType::Merge,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_decodes_as_meta_sentinel() {
        let (v, used) = ValueObject::decode(&[], false).unwrap();
        assert!(matches!(v.value_type, KeyType::Meta));
        assert_eq!(used, 0);
        assert!(v.vals.is_empty());
    }

    #[test]
    fn empty_vals_on_nonempty_buffer_is_not_the_sentinel() {
        let buf = vec![KeyType::String as u8, 0];
        let (v, used) = ValueObject::decode(&buf, false).unwrap();
        assert!(matches!(v.value_type, KeyType::String));
        assert_eq!(used, 2);
        assert!(v.vals.is_empty());
    }

    #[test]
    fn string_value_roundtrips() {
        let mut v = ValueObject::new(KeyType::String);
        v.vals = vec![Data::from("hello")];
        let buf = v.encode();
        let (decoded, used) = ValueObject::decode(&buf, false).unwrap();
        assert_eq!(used, buf.len());
        assert_eq!(decoded.vals[0].as_bytes(), Some(&b"hello"[..]));
    }

    #[test]
    fn merge_op_roundtrips() {
        let mut v = ValueObject::new(KeyType::Merge);
        v.merge_op = 7;
        v.vals = vec![Data::Int(3)];
        let buf = v.encode();
        let (decoded, _) = ValueObject::decode(&buf, false).unwrap();
        assert_eq!(decoded.merge_op, 7);
        assert_eq!(decoded.vals[0].as_int(), Some(3));
    }

    #[test]
    fn ttl_get_set() {
        let mut v = ValueObject::new(KeyType::Meta);
        assert_eq!(v.get_ttl(), 0);
        v.set_ttl(1_700_000_000_000);
        assert_eq!(v.get_ttl(), 1_700_000_000_000);
    }

    #[test]
    fn mkey_meta_tracks_size_and_bounds() {
        let mut v = ValueObject::new(KeyType::ZSet);
        v.set_size(4);
        v.set_min_max_data(Data::Int(1), Data::Int(100));
        let meta = v.get_zset_meta();
        assert_eq!(meta.size, 4);
        assert_eq!(meta.meta.min_data.unwrap().as_int(), Some(1));
        assert_eq!(meta.meta.max_data.unwrap().as_int(), Some(100));

        v.clear_min_max_data();
        let meta = v.get_zset_meta();
        assert!(meta.meta.min_data.is_none());
        assert!(meta.meta.max_data.is_none());
    }

    #[test]
    fn list_meta_tracks_index_window() {
        let mut v = ValueObject::new(KeyType::List);
        v.set_size(2);
        v.set_list_bounds(-1, 1);
        let meta = v.get_list_meta();
        assert_eq!(meta.size, 2);
        assert_eq!(meta.left_index, -1);
        assert_eq!(meta.right_index, 1);
    }

    #[test]
    fn decode_meta_reads_ttl_without_full_parse() {
        let mut v = ValueObject::new(KeyType::Meta);
        v.set_ttl(42);
        let buf = v.encode();
        assert_eq!(ValueObject::decode_meta(&buf), Some(42));
        assert_eq!(ValueObject::decode_meta(&[]), Some(0));
    }

    #[test]
    fn set_type_reserves_slots_for_collection_metas() {
        let v = ValueObject::new(KeyType::Hash);
        assert!(v.vals.len() >= 4);
        let v = ValueObject::new(KeyType::List);
        assert!(v.vals.len() >= 6);
    }
}
