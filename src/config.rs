//! Configuration loading.
//!
//! This module provides:
//! - [`ValidationConfig`]: message catalog, image messages and the schema
//!   directory, read from a JSON file
//! - [`SchemaSet`]: named JSON Schemas loaded from a directory, with errors
//!   accumulated per file
//! - [`ConfigEnv`] / [`FileSystem`]: the file access seam, mockable in tests

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::MessageCatalog;
use crate::dispatch::ErrorRoutes;
use crate::error::BoxError;
use crate::form::{CompiledSchema, FormError};
use crate::image::{ImageErrorTranslator, ImageMessages};
use crate::middleware::{schema_validator, Interceptor, DEFAULT_BODY_LIMIT};
use crate::registry::{RegistryBuilder, RegistryError};

/// Where configuration and schema files are read from.
pub trait ConfigEnv: Send + Sync {
    type Fs: FileSystem;

    fn filesystem(&self) -> &Self::Fs;
}

/// File access used by the loaders.
pub trait FileSystem: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn read_file(&self, path: &Path) -> Result<String, Self::Error>;

    /// Paths of the entries in `path`, in a stable order.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, Self::Error>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    type Error = std::io::Error;

    fn read_file(&self, path: &Path) -> Result<String, Self::Error> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, Self::Error> {
        let mut entries = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();
        Ok(entries)
    }
}

/// The process environment: the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEnv {
    fs: StdFileSystem,
}

impl ConfigEnv for OsEnv {
    type Fs = StdFileSystem;

    fn filesystem(&self) -> &Self::Fs {
        &self.fs
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading a file
    #[error("IO error reading {0}: {1}")]
    Io(PathBuf, BoxError),

    /// JSON parsing error
    #[error("Parse error in {0}: {1}")]
    Parse(PathBuf, serde_json::Error),

    /// The schema file does not compile
    #[error("Schema error in {0}: {1}")]
    Schema(PathBuf, FormError),

    /// Invalid filename
    #[error("Invalid filename: {0}")]
    InvalidFileName(PathBuf),

    /// Two schemas share a name
    #[error("schema '{0}' already loaded")]
    DuplicateSchema(String),

    /// No schema with that name was loaded
    #[error("schema '{0}' not found")]
    UnknownSchema(String),

    /// Registry error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Multiple errors occurred
    #[error("Multiple errors: {0:?}")]
    Multiple(Vec<ConfigError>),
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

/// Settings for the validation layer.
///
/// Every field is optional in the JSON form:
///
/// ```json
/// {
///   "messages": {"users": {"post": {"conflict": "Email already taken"}}},
///   "imageMessages": {"mimeType": "PNG or JPEG only"},
///   "schemasDir": "schemas",
///   "bodyLimit": 1048576
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    #[serde(default)]
    pub messages: MessageCatalog,
    #[serde(default)]
    pub image_messages: ImageMessages,
    /// Directory of `*.json` schema files. Relative paths resolve against the
    /// directory of the configuration file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schemas_dir: Option<PathBuf>,
    /// Largest request body an interceptor buffers, in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            messages: MessageCatalog::default(),
            image_messages: ImageMessages::default(),
            schemas_dir: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ValidationConfig {
    /// Parses configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Loads configuration from a file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, &OsEnv::default())
    }

    /// Loads configuration through `env`.
    pub fn load_with_env<E: ConfigEnv>(
        path: impl AsRef<Path>,
        env: &E,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = env
            .filesystem()
            .read_file(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), Box::new(e)))?;

        let mut config =
            Self::from_json(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;

        if let (Some(dir), Some(base)) = (&config.schemas_dir, path.parent()) {
            if dir.is_relative() {
                config.schemas_dir = Some(base.join(dir));
            }
        }

        tracing::debug!(path = %path.display(), "loaded validation config");
        Ok(config)
    }

    /// The error dispatch chain for the configured catalog.
    pub fn error_routes(&self) -> ErrorRoutes {
        ErrorRoutes::new(self.messages.clone())
    }

    /// The image error translator for the configured messages.
    pub fn image_translator(&self) -> ImageErrorTranslator {
        ImageErrorTranslator::new(self.image_messages.clone())
    }

    /// Loads the schema directory, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Multiple` with every per-file failure.
    pub fn schemas_with_env<E: ConfigEnv>(&self, env: &E) -> Result<SchemaSet, ConfigError> {
        let mut schemas = SchemaSet::new().with_body_limit(self.body_limit);
        if let Some(dir) = &self.schemas_dir {
            schemas.load_dir_with_env(dir, env)?;
        }
        Ok(schemas)
    }
}

/// Named, compiled JSON Schemas.
///
/// # Example
///
/// ```rust
/// use reqguard::config::SchemaSet;
/// use serde_json::json;
///
/// let mut schemas = SchemaSet::new();
/// schemas.insert("user", &json!({"required": ["name"]})).unwrap();
///
/// let interceptor = schemas.interceptor("user", Some("users.post")).unwrap();
/// assert!(schemas.interceptor("missing", None).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SchemaSet {
    schemas: IndexMap<String, Arc<CompiledSchema>>,
    body_limit: usize,
}

impl Default for SchemaSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaSet {
    pub fn new() -> Self {
        Self {
            schemas: IndexMap::new(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Sets the body limit of the interceptors this set builds.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Compiles and adds a schema.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateSchema` if the name is taken and
    /// `ConfigError::Schema` if the definition does not compile.
    pub fn insert(&mut self, name: impl Into<String>, definition: &Value) -> Result<(), ConfigError> {
        let name = name.into();
        let compiled = CompiledSchema::compile(definition)
            .map_err(|e| ConfigError::Schema(PathBuf::from(&name), e))?;
        self.add(name, compiled)
    }

    fn add(&mut self, name: String, compiled: CompiledSchema) -> Result<(), ConfigError> {
        if self.schemas.contains_key(&name) {
            return Err(ConfigError::DuplicateSchema(name));
        }
        self.schemas.insert(name, Arc::new(compiled));
        Ok(())
    }

    /// Compiles every `*.json` file in `dir` under its file stem; other
    /// entries are ignored.
    ///
    /// One broken file does not keep the rest out of the set. Every failure
    /// is reported together in [`ConfigError::Multiple`].
    pub fn load_dir_with_env<E: ConfigEnv>(
        &mut self,
        dir: impl AsRef<Path>,
        env: &E,
    ) -> Result<(), ConfigError> {
        let dir = dir.as_ref();
        let fs = env.filesystem();
        let entries = fs
            .read_dir(dir)
            .map_err(|e| ConfigError::Io(dir.to_path_buf(), Box::new(e)))?;

        let mut failures = Vec::new();
        for file in entries.iter().filter(|p| p.extension().is_some_and(|ext| ext == "json")) {
            match self.load_file(file, fs) {
                Ok(name) => tracing::debug!(schema = %name, file = %file.display(), "loaded schema"),
                Err(err) => {
                    tracing::warn!(file = %file.display(), error = %err, "skipping schema file");
                    failures.push(err);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Multiple(failures))
        }
    }

    /// Reads, parses and compiles one schema file, returning its name.
    fn load_file<Fs: FileSystem>(&mut self, file: &Path, fs: &Fs) -> Result<String, ConfigError> {
        let name = file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_owned)
            .ok_or_else(|| ConfigError::InvalidFileName(file.to_path_buf()))?;

        let text = fs
            .read_file(file)
            .map_err(|e| ConfigError::Io(file.to_path_buf(), Box::new(e)))?;
        let definition: Value =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse(file.to_path_buf(), e))?;
        let compiled = CompiledSchema::compile(&definition)
            .map_err(|e| ConfigError::Schema(file.to_path_buf(), e))?;

        self.add(name.clone(), compiled)?;
        Ok(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CompiledSchema>> {
        self.schemas.get(name)
    }

    /// Schema names in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Builds a schema interceptor for the named schema.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownSchema` if no schema has that name.
    pub fn interceptor(&self, name: &str, error_key: Option<&str>) -> Result<Interceptor, ConfigError> {
        let compiled = self
            .get(name)
            .ok_or_else(|| ConfigError::UnknownSchema(name.to_string()))?;

        Ok(
            Interceptor::new(schema_validator(Arc::clone(compiled), error_key.map(str::to_owned)))
                .with_body_limit(self.body_limit),
        )
    }

    /// Registers every schema as a validator factory under its own name.
    ///
    /// The factory reads an optional error key from `{"key": "..."}`.
    pub fn register_into(&self, mut builder: RegistryBuilder) -> Result<RegistryBuilder, RegistryError> {
        for (name, compiled) in &self.schemas {
            let compiled = Arc::clone(compiled);
            builder = builder.register(name.clone(), move |args: &Value| {
                let key = args.get("key").and_then(Value::as_str).map(str::to_owned);
                schema_validator(Arc::clone(&compiled), key)
            })?;
        }
        Ok(builder)
    }
}
