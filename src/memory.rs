//! Built-in memory kinds.
//!
//! These are the record variants shipped with the crate and registered in the
//! default registry. The store itself never refers to them; they are ordinary
//! [`TypedRecord`] implementations like any user-defined kind.
//!
//! | kind   | type           | payload                  |
//! |--------|----------------|--------------------------|
//! | `unit` | [`UnitMemory`] | name only                |
//! | `text` | [`TextMemory`] | free text                |
//! | `code` | [`CodeMemory`] | source code and language |
//! | `todo` | [`TodoMemory`] | checklist of items       |
//! | `list` | [`ListMemory`] | ordered list of strings  |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{RecordRegistry, TypedRecord};

/// Register every built-in kind, replacing existing decoders of the same kind.
pub fn register_builtin(registry: &mut RecordRegistry) {
    registry.insert::<UnitMemory>();
    registry.insert::<TextMemory>();
    registry.insert::<CodeMemory>();
    registry.insert::<TodoMemory>();
    registry.insert::<ListMemory>();
}

/// A memory that is nothing but a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMemory {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl UnitMemory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: None,
        }
    }
}

impl TypedRecord for UnitMemory {
    const KIND: &'static str = "unit";

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMemory {
    pub name: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl TextMemory {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            created: None,
        }
    }

    /// Stamp the memory with the current time.
    pub fn created_now(mut self) -> Self {
        self.created = Some(Utc::now());
        self
    }
}

impl TypedRecord for TextMemory {
    const KIND: &'static str = "text";

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMemory {
    pub name: String,
    #[serde(default)]
    pub language: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl CodeMemory {
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            code: code.into(),
            created: None,
        }
    }
}

impl TypedRecord for CodeMemory {
    const KIND: &'static str = "code";

    fn name(&self) -> &str {
        &self.name
    }
}

/// One entry of a [`TodoMemory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl TodoItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoMemory {
    pub name: String,
    #[serde(default)]
    pub items: Vec<TodoItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl TodoMemory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            created: None,
        }
    }

    pub fn with_item(mut self, text: impl Into<String>) -> Self {
        self.items.push(TodoItem::new(text));
        self
    }

    /// Mark the item at `index` as done. Returns false if there is no such item.
    pub fn complete(&mut self, index: usize) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.done = true;
                true
            }
            None => false,
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &TodoItem> {
        self.items.iter().filter(|item| !item.done)
    }
}

impl TypedRecord for TodoMemory {
    const KIND: &'static str = "todo";

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMemory {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl ListMemory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            created: None,
        }
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entries.push(entry.into());
        self
    }
}

impl TypedRecord for ListMemory {
    const KIND: &'static str = "list";

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{decode_from_json, Record};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_todo_encoding() {
        let todo = TodoMemory::new("chores")
            .with_item("dishes")
            .with_item("laundry");

        assert_eq!(
            todo.encode().unwrap(),
            json!({
                "type": "todo",
                "name": "chores",
                "items": [
                    {"text": "dishes", "done": false},
                    {"text": "laundry", "done": false}
                ]
            })
        );
    }

    #[test]
    fn test_todo_complete() {
        let mut todo = TodoMemory::new("chores")
            .with_item("dishes")
            .with_item("laundry");

        assert!(todo.complete(0));
        assert!(!todo.complete(5));

        let pending: Vec<&str> = todo.pending().map(|item| item.text.as_str()).collect();
        assert_eq!(pending, vec!["laundry"]);
    }

    #[test]
    fn test_created_survives_decoding() {
        let text = TextMemory::new("note", "remember the milk").created_now();
        let raw = serde_json::to_vec(&text.encode().unwrap()).unwrap();

        let decoded = decode_from_json(&raw).unwrap();
        assert_eq!(decoded.downcast_ref::<TextMemory>(), Some(&text));
    }

    #[test]
    fn test_optional_fields_default() {
        let code = decode_from_json(br#"{"type":"code","name":"snippet","code":"ls"}"#).unwrap();
        let code = code.downcast_ref::<CodeMemory>().unwrap();
        assert_eq!(code.language, "");
        assert_eq!(code.created, None);

        let list = decode_from_json(br#"{"type":"list","name":"empty"}"#).unwrap();
        assert_eq!(list.downcast_ref::<ListMemory>(), Some(&ListMemory::new("empty")));
    }

    #[test]
    fn test_kinds() {
        let records: Vec<Box<dyn Record>> = vec![
            Box::new(UnitMemory::new("a")),
            Box::new(TextMemory::new("b", "")),
            Box::new(CodeMemory::new("c", "rust", "fn main() {}")),
            Box::new(TodoMemory::new("d")),
            Box::new(ListMemory::new("e").with_entry("x")),
        ];

        let kinds: Vec<&str> = records.iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, vec!["unit", "text", "code", "todo", "list"]);
    }
}
