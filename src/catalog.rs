//! Message catalogs for translating error keys.
//!
//! A [`MessageCatalog`] is a nested JSON mapping. Keys are dotted paths into
//! it: `test.post.conflict` resolves `{"test": {"post": {"conflict": "..."}}}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nested lookup table from dotted keys to user-facing messages.
///
/// Lookups are pure. A missing key yields `None`; choosing the fallback text is
/// left to the caller, since it differs per error kind.
///
/// # Example
///
/// ```rust
/// use reqguard::MessageCatalog;
/// use serde_json::json;
///
/// let catalog = MessageCatalog::new(json!({
///     "test": {"post": {"conflict": "conflict test message"}}
/// }));
///
/// assert_eq!(catalog.lookup("test.post.conflict"), Some("conflict test message"));
/// assert_eq!(catalog.lookup("test.post"), None);
/// assert_eq!(catalog.get_or("missing", "Untranslated"), "Untranslated");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageCatalog(Value);

impl MessageCatalog {
    /// Wraps a nested JSON mapping.
    pub fn new(messages: Value) -> Self {
        Self(messages)
    }

    /// A catalog without entries.
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Resolves a dotted key to a message.
    ///
    /// Numeric segments index into arrays. Only string leaves count as
    /// messages; intermediate objects and non-string values yield `None`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        key.split('.')
            .try_fold(&self.0, |node, segment| match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
            .and_then(Value::as_str)
    }

    /// Resolves a dotted key, falling back to `fallback` when absent.
    pub fn get_or<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.lookup(key).unwrap_or(fallback)
    }

    /// Returns the underlying JSON mapping.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for MessageCatalog {
    fn from(messages: Value) -> Self {
        Self::new(messages)
    }
}
