//! # rdb-storage
//!
//! Storage codec and ordered-KV engine adapter core for a Redis-compatible
//! data server: a flat, ordered byte keyspace that maps every logical
//! Redis data type onto range-scan-correct keys over a generic ordered
//! key-value backend.
//!
//! ## Layout
//!
//! - [`data`] — the tagged scalar (`Data`) used as both a key element and a
//!   value slot, with an order-preserving wire form.
//! - [`key`] / [`value`] — the key and value codecs built on top of `Data`.
//! - [`range`] — `ZRANGEBYSCORE`/`ZRANGEBYLEX`-style range-spec parsing.
//! - [`merge`] — the deferred read-modify-write merge operator.
//! - [`compaction`] — the TTL sweep run during compaction.
//! - [`backend`] — the generic `OrderedKv` trait plus an in-memory impl;
//!   [`backend_heed`] supplies the LMDB-backed production implementation.
//! - [`engine`] / [`txn`] / [`iter`] — the namespace-scoped adapter that
//!   ties the codecs to a backend, plus its transaction and iterator types.
//!
//! ## Quick start
//!
//! ```rust
//! use rdb_storage::data::Data;
//! use rdb_storage::engine::Engine;
//! use rdb_storage::key::{KeyObject, KeyType};
//! use rdb_storage::value::ValueObject;
//! use std::borrow::Cow;
//!
//! let engine = Engine::in_memory();
//! let ns = Data::Bytes(Cow::Borrowed(&b"db0"[..]));
//! let key = KeyObject::new(ns, Data::from("greeting"), KeyType::String);
//! let mut value = ValueObject::new(KeyType::String);
//! value.vals = vec![Data::from("hello")];
//!
//! engine.put("db0", &key, &value).unwrap();
//! let got = engine.get("db0", &key).unwrap();
//! assert_eq!(got.vals[0].as_bytes(), Some(&b"hello"[..]));
//! ```

pub mod backend;
#[cfg(feature = "heed-backend")]
pub mod backend_heed;
pub mod compaction;
pub mod data;
pub mod engine;
pub mod error;
pub mod iter;
pub mod key;
pub mod merge;
pub mod range;
pub mod txn;
pub mod value;
pub(crate) mod varint;

pub use data::Data;
pub use engine::{Engine, EngineOptions};
pub use error::{Result, StorageError};
pub use key::{KeyObject, KeyType};
pub use value::ValueObject;
