//! Image constraint checks.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use indexmap::IndexSet;

use super::error::{
    AttributeConstraints, DimensionConstraints, FileConstraints, ImageCheck,
    ImageValidationError, ObservedMetadata, Reason,
};
use super::probe::{Dimensions, FileStat, ImageEnv, ImageIdentifier, ProbeError};

/// Checks whether an image file meets size, mime type and dimension
/// requirements.
///
/// All I/O goes through the [`ImageEnv`] passed to each check.
///
/// # Example
///
/// ```rust,ignore
/// use reqguard::image::{FileConstraints, ImageValidator, SystemEnv, MagickIdentifier};
///
/// let env = SystemEnv::new(MagickIdentifier::new());
/// let size = ImageValidator::new("upload.png")
///     .assert_file_constraints(&env, &FileConstraints { max_size: 1 << 20 })
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct ImageValidator {
    path: PathBuf,
}

impl ImageValidator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks the file size against `constraints`.
    ///
    /// Returns the measured size in bytes when the file is small enough.
    ///
    /// # Errors
    ///
    /// Fails with a rejected check carrying [`Reason::MaxFileSize`] when the
    /// file is larger than `max_size`, or with a fault when the size could
    /// not be read.
    pub async fn assert_file_constraints<E: ImageEnv>(
        &self,
        env: &E,
        constraints: &FileConstraints,
    ) -> Result<u64, ImageValidationError> {
        tracing::debug!(path = %self.path.display(), "retrieving file stats");

        let size = self
            .probe(env.file_stat().file_size(&self.path))
            .await
            .map_err(|err| {
                let message = format!(
                    "Error while retrieving stats for file {}",
                    self.path.display()
                );
                tracing::error!(path = %self.path.display(), error = %err, "file stat failed");
                ImageValidationError::fault(message, err)
            })?;

        if size > constraints.max_size {
            tracing::debug!(size, max_size = constraints.max_size, "image file too large");
            return Err(ImageValidationError::rejected(
                "Image file does not meet given file constraints",
                ImageCheck::failed([Reason::MaxFileSize]),
            ));
        }

        Ok(size)
    }

    /// Checks mime type and dimensions against `constraints`.
    ///
    /// Only the constraint groups present in `constraints` are checked and
    /// recorded in the resulting metadata.
    ///
    /// # Errors
    ///
    /// Fails with the full [`ImageCheck`] when any check fails, or with a
    /// fault when the image could not be identified.
    pub async fn assert_attribute_constraints<E: ImageEnv>(
        &self,
        env: &E,
        constraints: &AttributeConstraints,
    ) -> Result<ImageCheck, ImageValidationError> {
        let identity = self
            .probe(env.identifier().identify(&self.path))
            .await
            .map_err(|err| {
                let message = format!(
                    "Unable to retrieve image metadata for file {}",
                    self.path.display()
                );
                tracing::error!(path = %self.path.display(), error = %err, "identify failed");
                ImageValidationError::fault(message, err)
            })?;

        let mut reasons = IndexSet::new();
        let mut metadata = ObservedMetadata::default();

        if let Some(allowed) = &constraints.mime_types {
            tracing::debug!(path = %self.path.display(), "validating image mime type");
            let mime_type = identity.effective_mime_type();
            if let Some(reason) = check_mime_type(mime_type.as_deref(), allowed) {
                reasons.insert(reason);
            }
            metadata.mime_type = mime_type;
        }

        if let Some(dimensions) = &constraints.dimensions {
            tracing::debug!(path = %self.path.display(), "validating image dimensions");
            reasons.extend(check_dimensions(identity.size.as_ref(), dimensions));
            metadata.size = identity.size;
        }

        let check = ImageCheck {
            is_valid: reasons.is_empty(),
            reasons,
            metadata,
            conditions: Some(constraints.clone()),
        };

        if check.is_valid {
            Ok(check)
        } else {
            Err(ImageValidationError::rejected(
                "Image attributes does not match given constraints",
                check,
            ))
        }
    }

    /// Runs a probe, turning a panic into [`ProbeError::Panicked`].
    async fn probe<T, F>(&self, fut: F) -> Result<T, ProbeError>
    where
        F: Future<Output = Result<T, ProbeError>>,
    {
        if self.path.as_os_str().is_empty() {
            return Err(ProbeError::InvalidPath);
        }

        AssertUnwindSafe(fut)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ProbeError::Panicked(panic_message(payload))))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn check_mime_type(mime_type: Option<&str>, allowed: &[String]) -> Option<Reason> {
    match mime_type {
        None => {
            tracing::debug!("unable to identify mime type");
            Some(Reason::MimeType)
        }
        Some(mime) if !allowed.iter().any(|a| a == mime) => {
            tracing::debug!(mime_type = mime, ?allowed, "incompatible image mime type");
            Some(Reason::MimeType)
        }
        Some(_) => None,
    }
}

fn check_dimensions(size: Option<&Dimensions>, constraints: &DimensionConstraints) -> Vec<Reason> {
    let Some(size) = size else {
        tracing::debug!("unable to identify image dimensions");
        return vec![Reason::Dimensions];
    };

    let below = |actual: Option<u32>, minimum: Option<u32>| match minimum {
        Some(min) => actual.map_or(true, |value| value < min),
        None => false,
    };

    let mut reasons = Vec::new();
    if below(size.width, constraints.min_width) {
        tracing::debug!(?size, min_width = ?constraints.min_width, "image narrower than minimum");
        reasons.push(Reason::MinWidth);
    }
    if below(size.height, constraints.min_height) {
        tracing::debug!(?size, min_height = ?constraints.min_height, "image shorter than minimum");
        reasons.push(Reason::MinHeight);
    }
    reasons
}
