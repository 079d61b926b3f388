//! Error types for the storage core.
//!
//! Codec functions (`Data`, `KeyObject`, `ValueObject` encode/decode) use
//! `Option`/`bool` returns per spec: a decode failure is routine and the
//! caller just discards the object. The engine adapter surface, which talks
//! to a real backend, returns `Result<T, StorageError>` so failures compose
//! with `?`.

use std::fmt;

/// The kinds of failure the storage core can report.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Short read, invalid tag, or an element/value count outside its valid range.
    #[error("decode error: {0}")]
    Decode(String),

    /// The requested namespace does not exist and the caller did not ask
    /// for create-on-write.
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    /// The underlying ordered-KV backend reported a failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// A caller-supplied argument was invalid (bad range spec, wrong
    /// accessor for a key's type, …).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend reported on-disk corruption.
    #[error("corruption: {0}")]
    Corruption(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn backend<E: fmt::Display>(e: E) -> Self {
        StorageError::Backend(e.to_string())
    }
}
