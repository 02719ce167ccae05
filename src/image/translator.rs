//! Human-readable messages for image validation errors.

use serde::{Deserialize, Serialize};

use super::error::{ImageCause, ImageValidationError, Reason};

/// Returned when an image error carries no reason the translator knows.
pub const UNTRANSLATABLE: &str = "Untranslatable error";

/// Built-in messages used for every slot left empty.
pub const DEFAULT_MESSAGES: DefaultMessages = DefaultMessages {
    error: "Unsupported image",
    dimensions_minimum: "Image does not meet minimum required size",
    mime_type: "Unsupported mime type",
    max_file_size: "Image file size is greater than maximum allowed",
};

/// The built-in message set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultMessages {
    pub error: &'static str,
    pub dimensions_minimum: &'static str,
    pub mime_type: &'static str,
    pub max_file_size: &'static str,
}

/// Messages for dimension failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionMessages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<String>,
}

/// User-supplied image messages. Every slot is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMessages {
    /// Used when validation could not complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<String>,
    #[serde(default)]
    pub dimensions: DimensionMessages,
}

/// Translates [`ImageValidationError`]s to messages.
///
/// The first matching rule wins: a fault, then `maxFileSize`, then
/// `mimeType`, then either dimension minimum.
///
/// # Example
///
/// ```rust
/// use reqguard::image::{ImageCheck, ImageErrorTranslator, ImageMessages, ImageValidationError, Reason};
///
/// let translator = ImageErrorTranslator::new(ImageMessages {
///     mime_type: Some("PNG only".to_string()),
///     ..Default::default()
/// });
///
/// let err = ImageValidationError::rejected("bad", ImageCheck::failed([Reason::MimeType]));
/// assert_eq!(translator.translate(&err), "PNG only");
///
/// let err = ImageValidationError::rejected("bad", ImageCheck::failed([Reason::MinHeight]));
/// assert_eq!(translator.translate(&err), "Image does not meet minimum required size");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImageErrorTranslator {
    messages: ImageMessages,
}

impl ImageErrorTranslator {
    pub fn new(messages: ImageMessages) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &ImageMessages {
        &self.messages
    }

    pub fn translate(&self, error: &ImageValidationError) -> String {
        let msgs = &self.messages;
        let pick = |slot: &Option<String>, default: &str| {
            slot.clone().unwrap_or_else(|| default.to_string())
        };

        let check = match error.cause() {
            ImageCause::Fault(_) => return pick(&msgs.error, DEFAULT_MESSAGES.error),
            ImageCause::Result(check) => check,
        };

        if check.has_reason(Reason::MaxFileSize) {
            return pick(&msgs.max_file_size, DEFAULT_MESSAGES.max_file_size);
        }
        if check.has_reason(Reason::MimeType) {
            return pick(&msgs.mime_type, DEFAULT_MESSAGES.mime_type);
        }
        if check.has_reason(Reason::MinWidth) || check.has_reason(Reason::MinHeight) {
            return pick(&msgs.dimensions.minimum, DEFAULT_MESSAGES.dimensions_minimum);
        }

        tracing::warn!(error = %error, reasons = ?check.reasons, "untranslatable image error");
        UNTRANSLATABLE.to_string()
    }

    /// Translates an error known only as a trait object.
    ///
    /// # Panics
    ///
    /// Panics if `error` is not an [`ImageValidationError`]. Passing any other
    /// error is a programming mistake.
    pub fn translate_dyn(&self, error: &(dyn std::error::Error + 'static)) -> String {
        match error.downcast_ref::<ImageValidationError>() {
            Some(err) => self.translate(err),
            None => {
                let msg = "Error is not an ImageValidationError instance";
                tracing::error!(error = %error, "{msg}");
                panic!("{msg}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageCheck, ProbeError};

    fn rejected(reasons: &[Reason]) -> ImageValidationError {
        ImageValidationError::rejected("bad", ImageCheck::failed(reasons.iter().copied()))
    }

    #[test]
    fn test_fault_uses_error_slot() {
        let err = ImageValidationError::fault("io", ProbeError::InvalidPath);
        assert_eq!(ImageErrorTranslator::default().translate(&err), "Unsupported image");
    }

    #[test]
    fn test_priority_order() {
        let translator = ImageErrorTranslator::default();
        assert_eq!(
            translator.translate(&rejected(&[Reason::MinWidth, Reason::MimeType, Reason::MaxFileSize])),
            DEFAULT_MESSAGES.max_file_size
        );
        assert_eq!(
            translator.translate(&rejected(&[Reason::MinWidth, Reason::MimeType])),
            DEFAULT_MESSAGES.mime_type
        );
    }

    #[test]
    fn test_dimension_reason_alone_is_untranslatable() {
        let translator = ImageErrorTranslator::default();
        assert_eq!(translator.translate(&rejected(&[Reason::Dimensions])), UNTRANSLATABLE);
        assert_eq!(translator.translate(&rejected(&[])), UNTRANSLATABLE);
    }

    #[test]
    fn test_messages_deserialize_partially() {
        let messages: ImageMessages =
            serde_json::from_str(r#"{"dimensions": {"minimum": "Too small"}}"#).unwrap();
        assert_eq!(messages.dimensions.minimum.as_deref(), Some("Too small"));
        assert!(messages.error.is_none());
    }
}
