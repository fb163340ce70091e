//! Per-call store of coerced field values used for cross-field references.

use std::collections::HashMap;

use serde_json::Value;

/// One coerced field in a [`ValueStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEntry {
    /// Coerced value.
    pub value: Value,
    /// Kind of the schema that produced `value`.
    pub kind: &'static str,
    /// Original token before coercion.
    pub raw_value: Value,
}

/// Coerced values keyed by field name.
///
/// A store lives for exactly one validation call. An entry exists only once
/// its field's coercion succeeded, so rules can look up sibling values
/// without re-running coercion.
///
/// # Examples
///
/// ```
/// use chat_command_core::{StoreEntry, ValueStore};
/// use serde_json::json;
///
/// let mut store = ValueStore::new();
/// store.insert("a", StoreEntry { value: json!(5), kind: "number", raw_value: json!("5") });
/// assert_eq!(store.value("a"), Some(&json!(5)));
/// assert!(store.get("b").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    entries: HashMap<String, StoreEntry>,
}

impl ValueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `key`.
    pub fn insert(&mut self, key: impl Into<String>, entry: StoreEntry) {
        self.entries.insert(key.into(), entry);
    }

    /// Looks up the entry for `key`.
    pub fn get(&self, key: &str) -> Option<&StoreEntry> {
        self.entries.get(key)
    }

    /// Looks up only the coerced value for `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
