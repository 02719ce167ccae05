//! Probes: the external capabilities image validation depends on.
//!
//! The validator never touches files itself. It asks a [`FileStat`] for the
//! size of a file and an [`ImageIdentifier`] for its identification metadata,
//! both provided through an [`ImageEnv`]. Swap the environment to test
//! without real files or to plug in a different identification tool.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Failure of a probe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The path is empty or otherwise unusable.
    #[error("invalid file path")]
    InvalidPath,

    /// The file could not be read.
    #[error("io error on {path}: {message}")]
    Io {
        path: PathBuf,
        kind: io::ErrorKind,
        message: String,
    },

    /// The identification tool failed or produced unusable output.
    #[error("unable to identify {path}: {reason}")]
    Identify { path: PathBuf, reason: String },

    /// The probe panicked instead of returning an error.
    #[error("probe panicked: {0}")]
    Panicked(String),
}

impl ProbeError {
    pub fn io(path: &Path, err: &io::Error) -> Self {
        ProbeError::Io {
            path: path.to_path_buf(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Pixel dimensions as reported by the identification tool.
///
/// Either side may be missing when the tool could not determine it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

/// Identification metadata for an image file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageIdentity {
    /// Mime type, when the tool reports one explicitly.
    pub mime_type: Option<String>,
    /// Format name such as `PNG` or `JPEG`.
    pub format: Option<String>,
    pub size: Option<Dimensions>,
}

impl ImageIdentity {
    /// The explicit mime type, or `image/<format>` derived from the format.
    ///
    /// ```rust
    /// use reqguard::image::ImageIdentity;
    ///
    /// let identity = ImageIdentity {
    ///     format: Some("PNG".to_string()),
    ///     ..Default::default()
    /// };
    /// assert_eq!(identity.effective_mime_type().as_deref(), Some("image/png"));
    /// ```
    pub fn effective_mime_type(&self) -> Option<String> {
        self.mime_type.clone().or_else(|| {
            self.format
                .as_ref()
                .map(|format| format!("image/{}", format.to_lowercase()))
        })
    }
}

/// Reports the size of a file.
#[async_trait]
pub trait FileStat: Send + Sync {
    /// Returns the size of the file in bytes.
    async fn file_size(&self, path: &Path) -> Result<u64, ProbeError>;
}

/// Identifies an image file.
#[async_trait]
pub trait ImageIdentifier: Send + Sync {
    async fn identify(&self, path: &Path) -> Result<ImageIdentity, ProbeError>;
}

/// Environment trait providing the probes.
pub trait ImageEnv: Send + Sync {
    /// The file stat implementation type
    type Stat: FileStat;
    /// The identification implementation type
    type Identifier: ImageIdentifier;

    fn file_stat(&self) -> &Self::Stat;

    fn identifier(&self) -> &Self::Identifier;
}

/// [`FileStat`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileStat;

#[async_trait]
impl FileStat for TokioFileStat {
    async fn file_size(&self, path: &Path) -> Result<u64, ProbeError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ProbeError::io(path, &e))?;
        Ok(metadata.len())
    }
}

/// [`ImageIdentifier`] that runs ImageMagick's `identify`.
#[cfg(feature = "magick")]
#[derive(Debug, Clone)]
pub struct MagickIdentifier {
    program: PathBuf,
}

#[cfg(feature = "magick")]
impl MagickIdentifier {
    /// Uses `identify` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("identify")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[cfg(feature = "magick")]
impl Default for MagickIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "magick")]
#[async_trait]
impl ImageIdentifier for MagickIdentifier {
    async fn identify(&self, path: &Path) -> Result<ImageIdentity, ProbeError> {
        let output = tokio::process::Command::new(&self.program)
            .arg("-format")
            .arg("%m %w %h\n")
            .arg(path)
            .output()
            .await
            .map_err(|e| ProbeError::io(path, &e))?;

        if !output.status.success() {
            return Err(ProbeError::Identify {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_identify_line(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            ProbeError::Identify {
                path: path.to_path_buf(),
                reason: "unrecognized identify output".to_string(),
            }
        })
    }
}

/// Parses the first `FORMAT WIDTH HEIGHT` line printed by `identify`.
///
/// Multi-frame images print one line per frame; the first frame wins.
#[cfg_attr(not(feature = "magick"), allow(dead_code))]
fn parse_identify_line(output: &str) -> Option<ImageIdentity> {
    let mut fields = output.lines().next()?.split_whitespace();
    let format = fields.next()?.to_string();
    let width = fields.next().and_then(|w| w.parse().ok());
    let height = fields.next().and_then(|h| h.parse().ok());

    Some(ImageIdentity {
        mime_type: None,
        format: Some(format),
        size: Some(Dimensions { width, height }),
    })
}

/// The production environment: real file stats plus the given identifier.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv<I> {
    stat: TokioFileStat,
    identifier: I,
}

impl<I: ImageIdentifier> SystemEnv<I> {
    pub fn new(identifier: I) -> Self {
        Self {
            stat: TokioFileStat,
            identifier,
        }
    }
}

impl<I: ImageIdentifier> ImageEnv for SystemEnv<I> {
    type Stat = TokioFileStat;
    type Identifier = I;

    fn file_stat(&self) -> &Self::Stat {
        &self.stat
    }

    fn identifier(&self) -> &Self::Identifier {
        &self.identifier
    }
}
