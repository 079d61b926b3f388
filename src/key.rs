//! The key codec: logical keys encode to a flat byte string whose
//! lexicographic order is the contract every range scan and TTL sweep
//! depends on.
//!
//! Built from fixed-layout key builders generalized from a closed set of
//! keys to a `type` tag plus a variable, type-determined number of `Data`
//! elements, with the prefix/element split taken from a `KeyObject`
//! reference implementation.

use std::cmp::Ordering;

use crate::data::Data;
use crate::varint;

/// Key-type tag. `Merge` is a pseudo-type used only on
/// `ValueObject` and is never valid on a `KeyObject`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum KeyType {
    Meta = 0,
    String = 1,
    Hash = 2,
    List = 3,
    Set = 4,
    ZSet = 5,
    HashField = 6,
    ListElement = 7,
    SetMember = 8,
    ZSetScore = 9,
    ZSetSort = 10,
    Merge = 11,
}

impl KeyType {
    fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
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

    /// Number of `elements` a `KeyObject` of this type must carry.
    pub fn arity(self) -> usize {
        match self {
            KeyType::Meta
            | KeyType::String
            | KeyType::Hash
            | KeyType::List
            | KeyType::Set
            | KeyType::ZSet => 0,
            KeyType::HashField | KeyType::ListElement | KeyType::SetMember | KeyType::ZSetScore => 1,
            KeyType::ZSetSort => 2,
            KeyType::Merge => 0,
        }
    }

    /// True for every tag a `KeyObject` may legitimately carry
    /// (`KEY_MERGE` is value-only).
    pub fn is_valid_key_type(self) -> bool {
        !matches!(self, KeyType::Merge)
    }

    /// Map a collection's logical type to the type tag used by one of its
    /// elements.
    pub fn element_type(self) -> Option<KeyType> {
        Some(match self {
            KeyType::Hash => KeyType::HashField,
            KeyType::List => KeyType::ListElement,
            KeyType::Set => KeyType::SetMember,
            KeyType::ZSet => KeyType::ZSetScore,
            _ => return None,
        })
    }
}

/// Outcome of reading the element-count byte: distinguishes a genuine
/// zero-element key from a decode failure instead of conflating both
/// into a `0` return.
#[derive(Debug, PartialEq, Eq)]
pub enum ElementCountResult {
    Count(u8),
    Error,
}

/// A logical key: namespace + user key + type tag + type-determined element list.
///
/// `ns` routes to a column-family-like namespace out of band and is never
/// written into the encoded key bytes; it participates only in `Compare`
/// and in-memory equality.
#[derive(Clone, Debug)]
pub struct KeyObject<'a> {
    pub ns: Data<'a>,
    pub key: Data<'a>,
    pub key_type: KeyType,
    pub elements: Vec<Data<'a>>,
}

impl<'a> KeyObject<'a> {
    pub fn new(ns: Data<'a>, key: Data<'a>, key_type: KeyType) -> Self {
        let elements = vec![Data::Nil; key_type.arity()];
        KeyObject { ns, key, key_type, elements }
    }

    /// Change the type, resizing `elements` to the new type's arity.
    pub fn set_type(&mut self, key_type: KeyType) {
        self.key_type = key_type;
        self.elements.resize(key_type.arity(), Data::Nil);
    }

    pub fn is_valid(&self) -> bool {
        self.key_type.is_valid_key_type() && self.elements.len() == self.key_type.arity()
    }

    /// Write the `varuint32(key_len) ∥ key_bytes ∥ type_u8` prefix used both
    /// as the start of a full key encoding and, standalone, as a range-scan
    /// bound (`EncodePrefix`).
    pub fn encode_prefix(&self, buf: &mut Vec<u8>) {
        let key_bytes = self.key.as_bytes().unwrap_or(&[]);
        varint::write_varuint32(buf, key_bytes.len() as u32);
        buf.extend_from_slice(key_bytes);
        buf.push(self.key_type as u8);
    }

    /// Full encoding: prefix, element count, then each element
    /// self-delimited. Returns `None` if `verify` is set and the
    /// object fails `is_valid`.
    pub fn encode(&self, verify: bool) -> Option<Vec<u8>> {
        if verify && !self.is_valid() {
            return None;
        }
        let mut buf = Vec::new();
        self.encode_prefix(&mut buf);
        buf.push(self.elements.len() as u8);
        for el in &self.elements {
            el.encode(&mut buf);
        }
        Some(buf)
    }

    /// Decode the `key_len ∥ key_bytes ∥ type` prefix only, leaving element
    /// parsing to the caller (used to build/recognize range-scan prefixes).
    pub fn decode_prefix(buf: &'a [u8], ns: Data<'a>, clone_str: bool) -> Option<(KeyObject<'a>, usize)> {
        let (key_len, used) = varint::read_varuint32(buf)?;
        let key_len = key_len as usize;
        let key_bytes = buf.get(used..used + key_len)?;
        let key = if clone_str {
            Data::Bytes(std::borrow::Cow::Owned(key_bytes.to_vec()))
        } else {
            Data::Bytes(std::borrow::Cow::Borrowed(key_bytes))
        };
        let type_pos = used + key_len;
        let type_byte = *buf.get(type_pos)?;
        let key_type = KeyType::from_u8(type_byte)?;
        let consumed = type_pos + 1;
        Some((
            KeyObject { ns, key, key_type, elements: Vec::new() },
            consumed,
        ))
    }

    /// Read the element-count byte only. A count outside `[0, 127]` is a
    /// decode error, not "no elements".
    pub fn decode_element_count(buf: &[u8]) -> (ElementCountResult, usize) {
        match buf.first() {
            None => (ElementCountResult::Error, 0),
            Some(&b) if b > 127 => (ElementCountResult::Error, 1),
            Some(&b) => (ElementCountResult::Count(b), 1),
        }
    }

    /// Full decode: prefix, element count, then each element.
    pub fn decode(buf: &'a [u8], ns: Data<'a>, clone_str: bool) -> Option<(KeyObject<'a>, usize)> {
        let (mut obj, mut pos) = Self::decode_prefix(buf, ns, clone_str)?;
        let (count_result, count_len) = Self::decode_element_count(&buf[pos..]);
        pos += count_len;
        let count = match count_result {
            ElementCountResult::Error => return None,
            ElementCountResult::Count(n) => n,
        };
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (el, used) = Data::decode(&buf[pos..], clone_str)?;
            pos += used;
            elements.push(el);
        }
        obj.elements = elements;
        Some((obj, pos))
    }

    /// `(ns, key, type, elements.len, elements[0..])` in that order: equal
    /// namespace+key sorts by type, so a `KEY_META` record sits
    /// adjacent to all of that key's element records.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.ns
            .compare(&other.ns, false)
            .then_with(|| self.key.compare(&other.key, false))
            .then_with(|| (self.key_type as u8).cmp(&(other.key_type as u8)))
            .then_with(|| self.elements.len().cmp(&other.elements.len()))
            .then_with(|| {
                for (a, b) in self.elements.iter().zip(other.elements.iter()) {
                    let c = a.compare(b, false);
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                Ordering::Equal
            })
    }

    /// Promote every borrowed `Data` field to owned storage so this object
    /// outlives an iterator step it was decoded from.
    pub fn clone_string_part(&mut self) {
        self.ns.to_mutable_str();
        self.key.to_mutable_str();
        for el in &mut self.elements {
            el.to_mutable_str();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn ns(s: &str) -> Data<'_> {
        Data::Bytes(Cow::Borrowed(s.as_bytes()))
    }

    fn str_data(s: &str) -> Data<'_> {
        Data::Bytes(Cow::Borrowed(s.as_bytes()))
    }

    #[test]
    fn key_roundtrip() {
        let mut k = KeyObject::new(ns("u"), str_data("h"), KeyType::HashField);
        k.elements[0] = str_data("f");
        let encoded = k.encode(true).unwrap();
        let (decoded, used) = KeyObject::decode(&encoded, ns("u"), false).unwrap();
        assert_eq!(used, encoded.len());
        assert!(decoded.is_valid());
        assert_eq!(decoded.compare(&k), Ordering::Equal);
    }

    #[test]
    fn element_count_gate_rejects_over_127() {
        let buf = [128u8];
        let (result, _) = KeyObject::decode_element_count(&buf);
        assert_eq!(result, ElementCountResult::Error);
    }

    #[test]
    fn element_count_zero_is_not_an_error() {
        let buf = [0u8];
        let (result, used) = KeyObject::decode_element_count(&buf);
        assert_eq!(result, ElementCountResult::Count(0));
        assert_eq!(used, 1);
    }

    #[test]
    fn element_count_short_read_is_error() {
        let (result, used) = KeyObject::decode_element_count(&[]);
        assert_eq!(result, ElementCountResult::Error);
        assert_eq!(used, 0);
    }

    #[test]
    fn sort_order_matches_encoded_byte_order() {
        let a = {
            let mut k = KeyObject::new(ns("u"), str_data("h"), KeyType::HashField);
            k.elements[0] = str_data("a");
            k
        };
        let b = {
            let mut k = KeyObject::new(ns("u"), str_data("h"), KeyType::HashField);
            k.elements[0] = str_data("b");
            k
        };
        assert_eq!(a.compare(&b), Ordering::Less);
        assert!(a.encode(true).unwrap() < b.encode(true).unwrap());
    }

    #[test]
    fn meta_sorts_adjacent_to_its_elements() {
        let meta = KeyObject::new(ns("u"), str_data("h"), KeyType::Meta);
        let mut field = KeyObject::new(ns("u"), str_data("h"), KeyType::HashField);
        field.elements[0] = str_data("f");
        assert_eq!(meta.compare(&field), Ordering::Less);
        assert!(meta.encode(true).unwrap() < field.encode(true).unwrap());
    }

    #[test]
    fn invalid_type_is_rejected() {
        let mut k = KeyObject::new(ns("u"), str_data("h"), KeyType::HashField);
        k.elements[0] = str_data("f");
        k.key_type = KeyType::Merge;
        assert!(!k.is_valid());
        assert!(k.encode(true).is_none());
    }

    #[test]
    fn element_type_maps_collections_to_members() {
        assert_eq!(KeyType::Hash.element_type(), Some(KeyType::HashField));
        assert_eq!(KeyType::List.element_type(), Some(KeyType::ListElement));
        assert_eq!(KeyType::Set.element_type(), Some(KeyType::SetMember));
        assert_eq!(KeyType::ZSet.element_type(), Some(KeyType::ZSetScore));
        assert_eq!(KeyType::Meta.element_type(), None);
    }

    #[test]
    fn zset_sort_scans_in_score_order() {
        let scores = [-1.0, 0.0, 2.5, f64::MAX];
        let mut encoded: Vec<Vec<u8>> = scores
            .iter()
            .map(|&s| {
                let mut k = KeyObject::new(ns("z"), str_data("myset"), KeyType::ZSetSort);
                k.elements[0] = Data::Float(s);
                k.elements[1] = str_data("member");
                k.encode(true).unwrap()
            })
            .collect();
        let original = encoded.clone();
        encoded.sort();
        assert_eq!(encoded, original, "already in ascending score order");
    }

    #[test]
    fn clone_string_part_detaches_from_buffer() {
        let buf = {
            let mut k = KeyObject::new(ns("u"), str_data("h"), KeyType::HashField);
            k.elements[0] = str_data("f");
            k.encode(true).unwrap()
        };
        let ns_owned: Data<'static> = str_data("u").into_owned();
        let mut decoded = {
            let (mut d, _) = KeyObject::decode(&buf, ns_owned, false).unwrap();
            d.clone_string_part();
            // SAFETY-free: elements are now owned, so we can hand back a
            // 'static-shaped object without holding `buf` alive.
            KeyObject {
                ns: d.ns.into_owned(),
                key: d.key.into_owned(),
                key_type: d.key_type,
                elements: d.elements.into_iter().map(Data::into_owned).collect(),
            }
        };
        drop(buf);
        assert_eq!(decoded.key.as_bytes(), Some(&b"h"[..]));
        decoded.elements[0] = str_data("f").into_owned();
    }
}
