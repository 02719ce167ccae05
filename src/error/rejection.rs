use std::sync::Arc;

use super::validation::{BoxError, ValidationError};
use crate::image::ImageValidationError;

/// An error travelling from an interceptor towards the error routes.
///
/// Only [`Rejection::Validation`] is recognized by the dispatch chain;
/// anything else passes through to the outer framework.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Rejection {
    /// A failure from the validation taxonomy.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Any other failure.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl Rejection {
    /// Wraps an arbitrary error.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Rejection::Other(Arc::from(err.into()))
    }

    /// The validation error, if this rejection carries one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Rejection::Validation(err) => Some(err),
            Rejection::Other(_) => None,
        }
    }
}

impl From<ImageValidationError> for Rejection {
    fn from(err: ImageValidationError) -> Self {
        Rejection::other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageCheck, Reason};

    #[test]
    fn test_validation_errors_are_recognized() {
        let rejection = Rejection::from(ValidationError::not_found());
        assert_eq!(rejection.as_validation().map(|e| e.key()), Some("notFound"));
        assert_eq!(rejection.to_string(), "not found validation error (notFound)");
    }

    #[test]
    fn test_image_errors_are_not_taxonomy_errors() {
        let err = ImageValidationError::rejected("too big", ImageCheck::failed([Reason::MaxFileSize]));
        let rejection = Rejection::from(err);
        assert!(rejection.as_validation().is_none());
        assert_eq!(rejection.to_string(), "too big");
    }
}
