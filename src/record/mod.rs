//! Polymorphic record abstraction.
//!
//! A [`Record`] is an opaque, named value the store can persist without
//! knowing its concrete type. Every encoded record is a JSON object carrying a
//! `"type"` discriminant; the [`RecordRegistry`] uses that discriminant to pick
//! the decoder that rebuilds the concrete variant.
//!
//! Concrete record types usually implement [`TypedRecord`] and derive
//! `Serialize`/`Deserialize`. The blanket implementation takes care of the
//! discriminant on both sides:
//!
//! ```
//! use memories_store::record::{RecordRegistry, TypedRecord};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Bookmark {
//!     name: String,
//!     url: String,
//! }
//!
//! impl TypedRecord for Bookmark {
//!     const KIND: &'static str = "bookmark";
//!
//!     fn name(&self) -> &str {
//!         &self.name
//!     }
//! }
//!
//! let mut registry = RecordRegistry::new();
//! registry.register::<Bookmark>().unwrap();
//!
//! let record = registry
//!     .decode(br#"{"type":"bookmark","name":"docs","url":"https://docs.rs"}"#)
//!     .unwrap();
//! assert_eq!(record.name(), "docs");
//! assert!(record.downcast_ref::<Bookmark>().is_some());
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use thiserror::Error;

pub mod registry;

pub use registry::{decode_from_json, default_registry, RecordRegistry};

/// Name of the discriminant field every encoded record carries.
pub const KIND_FIELD: &str = "type";

/// Errors raised while encoding or decoding a single record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The raw bytes are not valid JSON.
    #[error("Invalid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    /// The fragment is valid JSON but not an object.
    #[error("Record fragment is not a JSON object")]
    NotAnObject,

    /// The fragment has no string `"type"` field.
    #[error("Record fragment has no \"type\" field")]
    MissingKind,

    /// No decoder is registered for the discriminant.
    #[error("Unknown record type: {0}")]
    UnknownKind(String),

    /// A decoder for this discriminant is already registered.
    #[error("Record type already registered: {0}")]
    DuplicateKind(String),

    /// The decoder rejected the fragment.
    #[error("Malformed {kind} record: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// The record could not be serialized.
    #[error("Failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A named, self-describing value the store can persist.
///
/// # Thread Safety
///
/// Records are shared as `Arc<dyn Record>`, so implementations must be
/// `Send + Sync`.
pub trait Record: Send + Sync + fmt::Debug {
    /// Stable name used as the key in a store.
    fn name(&self) -> &str;

    /// Discriminant written to the `"type"` field.
    fn kind(&self) -> &str;

    /// Encode the record as a JSON object including the `"type"` field.
    fn encode(&self) -> Result<Value, RecordError>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Record {
    /// Downcast to a concrete record type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// A record type with a fixed discriminant and a serde representation.
pub trait TypedRecord:
    Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static
{
    /// Discriminant this type is registered and encoded under.
    const KIND: &'static str;

    fn name(&self) -> &str;
}

impl<T: TypedRecord> Record for T {
    fn name(&self) -> &str {
        TypedRecord::name(self)
    }

    fn kind(&self) -> &str {
        T::KIND
    }

    fn encode(&self) -> Result<Value, RecordError> {
        match serde_json::to_value(self).map_err(RecordError::Encode)? {
            Value::Object(mut fields) => {
                fields.insert(KIND_FIELD.to_string(), Value::String(T::KIND.to_string()));
                Ok(Value::Object(fields))
            }
            _ => Err(RecordError::NotAnObject),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Read the discriminant out of an encoded fragment.
pub fn kind_of(value: &Value) -> Result<&str, RecordError> {
    let fields = value.as_object().ok_or(RecordError::NotAnObject)?;
    fields
        .get(KIND_FIELD)
        .and_then(Value::as_str)
        .ok_or(RecordError::MissingKind)
}
