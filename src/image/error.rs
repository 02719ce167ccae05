//! Image validation results and errors.

use std::fmt::{self, Display};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::probe::{Dimensions, ProbeError};

/// A failed image attribute check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reason {
    /// The file is larger than allowed.
    MaxFileSize,
    /// The mime type is unknown or not allowed.
    MimeType,
    /// The width is unknown or below the minimum.
    MinWidth,
    /// The height is unknown or below the minimum.
    MinHeight,
    /// The metadata carries no dimensions at all.
    Dimensions,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::MaxFileSize => "maxFileSize",
            Reason::MimeType => "mimeType",
            Reason::MinWidth => "minWidth",
            Reason::MinHeight => "minHeight",
            Reason::Dimensions => "dimensions",
        }
    }
}

impl Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraints on file-system attributes of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConstraints {
    /// Maximum file size in bytes (inclusive).
    pub max_size: u64,
}

/// Minimum dimensions in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<u32>,
}

/// Constraints on visual attributes of an image.
///
/// Only the constraint groups that are present get checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeConstraints {
    /// Allowed mime types, e.g. `image/png`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<DimensionConstraints>,
}

impl AttributeConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the allowed mime types.
    pub fn mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mime_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Requires a minimum width.
    pub fn min_width(mut self, width: u32) -> Self {
        self.dimensions.get_or_insert_with(Default::default).min_width = Some(width);
        self
    }

    /// Requires a minimum height.
    pub fn min_height(mut self, height: u32) -> Self {
        self.dimensions.get_or_insert_with(Default::default).min_height = Some(height);
        self
    }
}

/// Metadata observed while checking attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedMetadata {
    /// Effective mime type; only recorded when mime types were constrained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Reported size; only recorded when dimensions were constrained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Dimensions>,
}

/// The outcome of an image check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCheck {
    pub is_valid: bool,
    /// Distinct failure tags in the order the checks produced them.
    pub reasons: IndexSet<Reason>,
    pub metadata: ObservedMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<AttributeConstraints>,
}

impl ImageCheck {
    /// A check result carrying only failure reasons.
    pub fn failed<I: IntoIterator<Item = Reason>>(reasons: I) -> Self {
        Self {
            is_valid: false,
            reasons: reasons.into_iter().collect(),
            metadata: ObservedMetadata::default(),
            conditions: None,
        }
    }

    pub fn has_reason(&self, reason: Reason) -> bool {
        self.reasons.contains(&reason)
    }
}

/// Why image validation failed.
#[derive(Debug, Clone)]
pub enum ImageCause {
    /// The checks ran and at least one failed.
    Result(ImageCheck),
    /// A probe failed, so the checks could not run.
    Fault(ProbeError),
}

/// An image that does not meet the requirements, or could not be checked.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ImageValidationError {
    message: String,
    cause: ImageCause,
}

impl ImageValidationError {
    /// An error for checks that ran and failed.
    pub fn rejected(message: impl Into<String>, check: ImageCheck) -> Self {
        Self {
            message: message.into(),
            cause: ImageCause::Result(check),
        }
    }

    /// An error for a probe failure.
    pub fn fault(message: impl Into<String>, error: ProbeError) -> Self {
        Self {
            message: message.into(),
            cause: ImageCause::Fault(error),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> &ImageCause {
        &self.cause
    }

    /// The check result, if the checks ran.
    pub fn result(&self) -> Option<&ImageCheck> {
        match &self.cause {
            ImageCause::Result(check) => Some(check),
            ImageCause::Fault(_) => None,
        }
    }

    /// The probe failure, if the checks could not run.
    pub fn inner_error(&self) -> Option<&ProbeError> {
        match &self.cause {
            ImageCause::Fault(err) => Some(err),
            ImageCause::Result(_) => None,
        }
    }
}
