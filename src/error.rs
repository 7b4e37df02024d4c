use std::path::PathBuf;
use thiserror::Error;

use crate::fs::FsError;
use crate::record::RecordError;

/// Errors returned by [`RecordStore`](crate::store::RecordStore) operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// `get` on a name the store does not hold.
    #[error("No memory available with name: {0}")]
    NotFound(String),

    /// The backing path cannot be used as a store file.
    #[error("Invalid store path {}: {reason}", .path.display())]
    Configuration { path: PathBuf, reason: String },

    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: FsError,
    },

    /// The persisted document could not be decoded.
    #[error("{context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: DecodeError,
    },

    /// The in-memory state could not be encoded into a document.
    #[error("{context}: {source}")]
    Encode {
        context: String,
        #[source]
        source: EncodeError,
    },
}

/// What part of the document failed to decode.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("item {index}: {source}")]
    Fragment {
        index: usize,
        #[source]
        source: RecordError,
    },
}

/// What part of the document failed to encode.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// A record's own encoder failed. `name` is what the record reports,
    /// `key` is the name it is stored under.
    #[error("memory {name} (stored as {key}): {source}")]
    Record {
        name: String,
        key: String,
        #[source]
        source: RecordError,
    },

    #[error("invalid envelope: {0}")]
    Envelope(#[source] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: FsError) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn decode(context: impl Into<String>, source: DecodeError) -> Self {
        StoreError::Decode {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn encode(context: impl Into<String>, source: EncodeError) -> Self {
        StoreError::Encode {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
