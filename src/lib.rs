//! # memories-store: persistence for polymorphic memory records
//!
//! A small persistence layer that keeps a named collection of memory records
//! in a single JSON document and rebuilds the collection on startup.
//!
//! ## Layers
//!
//! - Filesystem ([`fs`]): the [`Filesystem`](fs::Filesystem) trait with an
//!   operating system backend and an in-memory backend
//! - Records ([`record`]): the [`Record`](record::Record) capability, the
//!   discriminant-based [`RecordRegistry`](record::RecordRegistry) and the
//!   [`decode_from_json`](record::decode_from_json) factory
//! - Memory kinds ([`memory`]): the built-in record variants
//! - Store ([`store`]): [`RecordStore`](store::RecordStore), the CRUD surface
//!   with load and save
//!
//! ## Document format
//!
//! ```text
//! {"items": [<record>, <record>, ...]}
//! ```
//!
//! Each record is a JSON object with a `"type"` field naming its kind. The
//! document carries no version field.

pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod record;
pub mod store;

// Re-exports
pub use config::{BackendType, StoreConfig, WriteMode};
pub use error::*;
pub use record::{decode_from_json, Record, RecordRegistry, TypedRecord};
pub use store::{RecordStore, StoreBuilder};
