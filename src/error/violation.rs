//! Schema violation records.
//!
//! This module provides [`Violation`] for a single schema-compliance failure
//! and [`Violations`] for the ordered, non-empty list reported for a payload.

use std::fmt::{self, Display};

use serde::Serialize;
use serde_json::{Map, Value};
use stillwater::prelude::*;

use crate::path::DataPath;

/// One structured schema-compliance failure.
///
/// A violation carries:
/// - **message**: human-readable description produced by the evaluator
/// - **params**: placeholder values for the message (keyword → schema value)
/// - **code**: numeric violation classification, passed through untouched
/// - **data_path**: JSON pointer to the offending field
///
/// Serializes to `{message, params, code, dataPath}`, the shape used in
/// schema error responses.
///
/// # Example
///
/// ```rust
/// use reqguard::{DataPath, Violation};
/// use serde_json::json;
///
/// let violation = Violation::new(DataPath::from_field("name"), "\"1\" is not of type \"string\"")
///     .with_code(0)
///     .with_param("type", json!("string"));
///
/// assert_eq!(violation.data_path.to_string(), "/name");
/// assert_eq!(violation.params["type"], "string");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Human-readable error message.
    pub message: String,
    /// Placeholder values referenced by the message.
    pub params: Map<String, Value>,
    /// Numeric classification of the failure.
    pub code: u32,
    /// Where in the payload the failure occurred.
    #[serde(rename = "dataPath")]
    pub data_path: DataPath,
}

impl Violation {
    /// Creates a violation at the given path with no params and code `0`.
    pub fn new(data_path: DataPath, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            params: Map::new(),
            code: 0,
            data_path,
        }
    }

    /// Sets the numeric code and returns self for chaining.
    pub fn with_code(mut self, code: u32) -> Self {
        self.code = code;
        self
    }

    /// Adds a message parameter and returns self for chaining.
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data_path.is_root() {
            write!(f, "(root): {} [{}]", self.message, self.code)
        } else {
            write!(f, "{}: {} [{}]", self.data_path, self.message, self.code)
        }
    }
}

impl std::error::Error for Violation {}

/// A non-empty, ordered collection of violations.
///
/// The order is the evaluator's reporting order and is never changed;
/// combining two collections appends.
#[derive(Debug, Clone, PartialEq)]
pub struct Violations(NonEmptyVec<Violation>);

impl Violations {
    /// Creates a collection containing a single violation.
    pub fn single(violation: Violation) -> Self {
        Self(NonEmptyVec::singleton(violation))
    }

    /// Creates a collection from a `Vec`, or `None` when it is empty.
    pub fn from_vec(violations: Vec<Violation>) -> Option<Self> {
        let mut iter = violations.into_iter();
        let head = Self::single(iter.next()?);
        Some(iter.fold(head, |acc, v| acc.combine(Self::single(v))))
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; the collection is guaranteed non-empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns an iterator over the violations in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// Returns the first reported violation.
    pub fn first(&self) -> &Violation {
        self.0.head()
    }

    /// Returns all violations at the given data path.
    pub fn at_path(&self, path: &DataPath) -> Vec<&Violation> {
        self.0.iter().filter(|v| &v.data_path == path).collect()
    }

    /// Returns all violations with the given code.
    pub fn with_code(&self, code: u32) -> Vec<&Violation> {
        self.0.iter().filter(|v| v.code == code).collect()
    }

    /// Converts this collection into a `Vec<Violation>`.
    pub fn into_vec(self) -> Vec<Violation> {
        self.0.into_vec()
    }
}

impl Semigroup for Violations {
    fn combine(self, other: Self) -> Self {
        Violations(self.0.combine(other.0))
    }
}

impl Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "payload failed schema with {} violation(s):", self.len())?;
        for (i, violation) in self.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

impl Serialize for Violations {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_vec().into_iter()
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<Violations>();
    assert_sync::<Violations>();
};
