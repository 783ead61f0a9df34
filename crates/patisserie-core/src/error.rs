//! Storage error types.
//!
//! Services catch these and degrade to empty/default state; they surface
//! only through the `try_*` methods for callers that want to report them.

use thiserror::Error;

/// Errors raised by a [`crate::storage::KeyValueStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The key contains characters the store does not allow.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// A value could not be serialized.
    #[error("failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored value could not be parsed.
    #[error("corrupt value for key '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The store cannot be used at all (quota, poisoned lock, ...).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
