//! Named validator factories.
//!
//! This module provides [`ValidatorRegistry`], which maps names to factories
//! producing [`Interceptor`]s from JSON arguments. Registration happens on a
//! [`RegistryBuilder`]; once built the registry is immutable and cheap to
//! share.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::middleware::{Interceptor, Validate};

type Factory = Arc<dyn Fn(&Value) -> Result<Interceptor, BoxError> + Send + Sync>;

/// Collects validator factories before freezing them into a
/// [`ValidatorRegistry`].
///
/// # Example
///
/// ```rust
/// use reqguard::{RegistryBuilder, ValidationError, ValidationRequest};
/// use serde_json::json;
///
/// let registry = RegistryBuilder::new()
///     .register("requireField", |args: &serde_json::Value| {
///         let field = args["field"].as_str().unwrap_or("id").to_string();
///         move |req: &ValidationRequest| {
///             req.body().get(&field).is_none().then(ValidationError::custom)
///         }
///     })
///     .unwrap()
///     .build();
///
/// assert!(registry.build("requireField", &json!({"field": "name"})).is_ok());
///
/// // Duplicate names are rejected
/// assert!(RegistryBuilder::new()
///     .register("a", |_: &serde_json::Value| |_: &ValidationRequest| ())
///     .unwrap()
///     .register("a", |_: &serde_json::Value| |_: &ValidationRequest| ())
///     .is_err());
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    factories: IndexMap<String, Factory>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateName` if the name is already registered.
    pub fn register<F, V>(self, name: impl Into<String>, factory: F) -> Result<Self, RegistryError>
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Validate,
    {
        self.insert(
            name.into(),
            Arc::new(move |args: &Value| -> Result<Interceptor, BoxError> {
                Ok(Interceptor::new(factory(args)))
            }),
        )
    }

    /// Registers a factory that may reject its arguments.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateName` if the name is already registered.
    pub fn register_fallible<F, V, E>(
        self,
        name: impl Into<String>,
        factory: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(&Value) -> Result<V, E> + Send + Sync + 'static,
        V: Validate,
        E: Into<BoxError>,
    {
        self.insert(
            name.into(),
            Arc::new(move |args: &Value| -> Result<Interceptor, BoxError> {
                factory(args).map(Interceptor::new).map_err(Into::into)
            }),
        )
    }

    fn insert(mut self, name: String, factory: Factory) -> Result<Self, RegistryError> {
        if self.factories.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        tracing::debug!(validator = %name, "registering validator");
        self.factories.insert(name, factory);
        Ok(self)
    }

    /// Freezes the registry.
    pub fn build(self) -> ValidatorRegistry {
        ValidatorRegistry {
            factories: Arc::new(self.factories),
        }
    }
}

/// An immutable set of named validator factories.
///
/// Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    factories: Arc<IndexMap<String, Factory>>,
}

impl ValidatorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Creates an interceptor from the factory registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` for unknown names and
    /// `RegistryError::Factory` when the factory rejects `args`.
    pub fn build(&self, name: &str, args: &Value) -> Result<Interceptor, RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        factory(args).map_err(|source| RegistryError::Factory {
            name: name.to_string(),
            source,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Attempted to register a validator with a name that already exists.
    #[error("validator '{0}' already registered")]
    DuplicateName(String),

    /// Attempted to build a validator with a name that doesn't exist.
    #[error("validator '{0}' not found")]
    NotFound(String),

    /// The factory rejected its arguments.
    #[error("validator '{name}' could not be built: {source}")]
    Factory {
        name: String,
        #[source]
        source: BoxError,
    },
}
