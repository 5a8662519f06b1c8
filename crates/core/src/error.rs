//! Typed errors raised by the store and snapshot layers.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures while reading or writing the durable key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File backing the key.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The backing file could not be written or moved into place.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File backing the key.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The key cannot be mapped to a file name.
    #[error("invalid store key '{0}'")]
    InvalidKey(String),
}

/// Reasons a stored snapshot is rejected on restore.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A value is not valid JSON or does not match the expected shape.
    #[error("malformed value under '{key}': {source}")]
    Malformed {
        /// Storage key holding the value.
        key: &'static str,
        /// Parser error.
        source: serde_json::Error,
    },
    /// Values parse but contradict each other.
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
    /// Serializing the in-memory state failed.
    #[error("failed to encode '{key}': {source}")]
    Encode {
        /// Storage key being written.
        key: &'static str,
        /// Serializer error.
        source: serde_json::Error,
    },
}
