//! Data path representation for locating offending values in request payloads.
//!
//! This module provides [`DataPath`] and [`PathSegment`] types. Paths render as
//! JSON pointers (RFC 6901), which is the format reported in the `dataPath`
//! field of schema violation records.

use std::fmt::{self, Display};

use serde::{Serialize, Serializer};

/// A segment of a data path.
///
/// Segments are either object property names or array indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A property access (e.g., `name`, `address`)
    Field(String),
    /// An array index access (e.g., `0`, `42`)
    Index(usize),
}

/// A path to a value inside a request payload.
///
/// `DataPath` displays as a JSON pointer, so a path built from the `items`
/// field, index `0` and the `name` field renders as `/items/0/name`. The root
/// path renders as the empty string.
///
/// # Example
///
/// ```rust
/// use reqguard::DataPath;
///
/// let path = DataPath::root()
///     .push_field("items")
///     .push_index(0)
///     .push_field("name");
///
/// assert_eq!(path.to_string(), "/items/0/name");
/// assert_eq!(DataPath::parse_pointer("/items/0/name"), path);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DataPath {
    segments: Vec<PathSegment>,
}

impl DataPath {
    /// Creates an empty path representing the root value.
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a path from a single field segment.
    pub fn from_field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Field(name.into())],
        }
    }

    /// Parses a JSON pointer such as `/items/0/name`.
    ///
    /// Only canonical decimal tokens become index segments, so keys like `01`
    /// render back unchanged. `~1` and `~0` escapes are decoded. The empty
    /// string yields the root path.
    pub fn parse_pointer(pointer: &str) -> Self {
        pointer
            .split('/')
            .skip(1)
            .fold(Self::root(), |path, token| match token.parse::<usize>() {
                Ok(idx) if idx.to_string() == token => path.push_index(idx),
                _ => path.push_field(token.replace("~1", "/").replace("~0", "~")),
            })
    }

    /// Appends a field segment.
    pub fn push_field(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Field(name.into()));
        self
    }

    /// Appends an index segment.
    pub fn push_index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    /// Returns true if this is the root path (no segments).
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments in this path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if this path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns an iterator over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }
}

impl Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                PathSegment::Field(name) => {
                    write!(f, "/{}", name.replace('~', "~0").replace('/', "~1"))?
                }
                PathSegment::Index(idx) => write!(f, "/{}", idx)?,
            }
        }
        Ok(())
    }
}

impl Serialize for DataPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
