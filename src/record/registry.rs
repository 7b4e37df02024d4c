use lazy_static::lazy_static;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::{kind_of, Record, RecordError, TypedRecord};
use crate::memory;

/// Decoder registered for one discriminant.
pub type DecodeFn = fn(Value) -> Result<Arc<dyn Record>, serde_json::Error>;

fn decode_typed<T: TypedRecord>(value: Value) -> Result<Arc<dyn Record>, serde_json::Error> {
    let record: T = serde_json::from_value(value)?;
    Ok(Arc::new(record))
}

/// Table of record decoders keyed by discriminant.
///
/// The registry is the factory the store uses to turn an opaque JSON fragment
/// back into a concrete record. It inspects the `"type"` field and dispatches
/// to the decoder registered for that value.
#[derive(Debug, Clone, Default)]
pub struct RecordRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl RecordRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in memory kinds registered.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        memory::register_builtin(&mut registry);
        registry
    }

    /// Register a typed record under its `KIND`.
    pub fn register<T: TypedRecord>(&mut self) -> Result<(), RecordError> {
        self.register_decoder(T::KIND, decode_typed::<T>)
    }

    /// Register a hand-written decoder for `kind`.
    pub fn register_decoder(&mut self, kind: &str, decode: DecodeFn) -> Result<(), RecordError> {
        if self.decoders.contains_key(kind) {
            return Err(RecordError::DuplicateKind(kind.to_string()));
        }
        self.decoders.insert(kind.to_string(), decode);
        Ok(())
    }

    /// Register or replace the decoder for `T::KIND`.
    pub(crate) fn insert<T: TypedRecord>(&mut self) {
        self.decoders.insert(T::KIND.to_string(), decode_typed::<T>);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// Registered discriminants in sorted order.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Decode a record from raw JSON bytes.
    pub fn decode(&self, raw: &[u8]) -> Result<Arc<dyn Record>, RecordError> {
        let value: Value = serde_json::from_slice(raw).map_err(RecordError::Syntax)?;
        self.decode_value(value)
    }

    /// Decode a record from an already parsed fragment.
    pub fn decode_value(&self, value: Value) -> Result<Arc<dyn Record>, RecordError> {
        let kind = kind_of(&value)?.to_string();
        let decode = self
            .decoders
            .get(&kind)
            .ok_or_else(|| RecordError::UnknownKind(kind.clone()))?;
        decode(value).map_err(|source| RecordError::Malformed { kind, source })
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: Arc<RecordRegistry> = Arc::new(RecordRegistry::with_builtin());
}

/// Process-wide registry holding the built-in memory kinds.
pub fn default_registry() -> Arc<RecordRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}

/// Decode a record from raw JSON using the default registry.
pub fn decode_from_json(raw: &[u8]) -> Result<Arc<dyn Record>, RecordError> {
    DEFAULT_REGISTRY.decode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{TextMemory, UnitMemory};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_default_registry_kinds() {
        assert_eq!(
            default_registry().kinds(),
            vec!["code", "list", "text", "todo", "unit"]
        );
    }

    #[test]
    fn test_decode_dispatches_on_kind() {
        let record =
            decode_from_json(br#"{"type":"text","name":"greeting","text":"hi"}"#).unwrap();

        assert_eq!(record.name(), "greeting");
        assert_eq!(record.kind(), "text");
        let text = record.downcast_ref::<TextMemory>().unwrap();
        assert_eq!(text.text, "hi");
    }

    #[test]
    fn test_decode_errors() {
        let registry = default_registry();

        assert!(matches!(
            registry.decode(b"{not json"),
            Err(RecordError::Syntax(_))
        ));
        assert!(matches!(
            registry.decode(br#"{"name":"x"}"#),
            Err(RecordError::MissingKind)
        ));
        assert!(matches!(
            registry.decode(br#""text""#),
            Err(RecordError::NotAnObject)
        ));

        match registry.decode(br#"{"type":"hologram","name":"x"}"#) {
            Err(RecordError::UnknownKind(kind)) => assert_eq!(kind, "hologram"),
            other => panic!("expected UnknownKind, got {:?}", other),
        }
        match registry.decode(br#"{"type":"text","name":"x"}"#) {
            Err(RecordError::Malformed { kind, .. }) => assert_eq!(kind, "text"),
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = RecordRegistry::new();
        registry.register::<UnitMemory>().unwrap();

        let err = registry.register::<UnitMemory>().unwrap_err();
        assert!(matches!(err, RecordError::DuplicateKind(kind) if kind == "unit"));
    }

    #[test]
    fn test_empty_registry_knows_nothing() {
        let registry = RecordRegistry::new();

        assert!(!registry.contains("unit"));
        assert!(matches!(
            registry.decode_value(json!({"type": "unit", "name": "u"})),
            Err(RecordError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_custom_decoder() {
        fn decode_alias(value: Value) -> Result<Arc<dyn Record>, serde_json::Error> {
            let unit: UnitMemory = serde_json::from_value(value)?;
            Ok(Arc::new(unit))
        }

        let mut registry = RecordRegistry::new();
        registry.register_decoder("legacy-unit", decode_alias).unwrap();

        let record = registry
            .decode(br#"{"type":"legacy-unit","name":"old"}"#)
            .unwrap();
        assert_eq!(record.name(), "old");
        assert_eq!(record.kind(), "unit");
    }
}
