//! Image upload validation.
//!
//! [`ImageValidator`] checks a file against [`FileConstraints`] and
//! [`AttributeConstraints`], and [`ImageErrorTranslator`] turns the resulting
//! [`ImageValidationError`] into a user-facing message. File access and image
//! identification are pluggable through [`ImageEnv`].

mod error;
mod probe;
mod translator;
mod validator;

pub use error::{
    AttributeConstraints, DimensionConstraints, FileConstraints, ImageCause, ImageCheck,
    ImageValidationError, ObservedMetadata, Reason,
};
#[cfg(feature = "magick")]
pub use probe::MagickIdentifier;
pub use probe::{
    Dimensions, FileStat, ImageEnv, ImageIdentifier, ImageIdentity, ProbeError, SystemEnv,
    TokioFileStat,
};
pub use translator::{
    DefaultMessages, DimensionMessages, ImageErrorTranslator, ImageMessages, DEFAULT_MESSAGES,
    UNTRANSLATABLE,
};
pub use validator::ImageValidator;
