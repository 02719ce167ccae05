//! # reqguard
//!
//! Request validation for axum services, with errors that render themselves.
//!
//! ## Overview
//!
//! Validation failures are typed [`ValidationError`]s tagged with an
//! [`ErrorKind`] and a message key. Interceptors raise them in front of your
//! handlers; [`ErrorRoutes`] renders them as JSON with a fixed status per kind,
//! translating keys through a [`MessageCatalog`]. Schema failures carry every
//! violation the evaluator reported, in order.
//!
//! ## Core Types
//!
//! - [`FormValidator`] / [`CompiledSchema`]: JSON Schema checks producing [`Violations`]
//! - [`custom`] / [`schema`]: build an [`Interceptor`] from a function or a schema
//! - [`ValidatorRegistry`]: named validator factories, frozen after construction
//! - [`ErrorRoutes`]: the error dispatch chain
//! - [`image`]: file-size, mime type and dimension checks for uploaded images
//! - [`config`]: catalog, image messages and schema directories from JSON files
//!
//! ## Example
//!
//! ```rust
//! use axum::{routing::post, Router};
//! use reqguard::{schema, ErrorRoutes, MessageCatalog};
//! use serde_json::json;
//!
//! let validate_user = schema(
//!     &json!({
//!         "required": ["name"],
//!         "properties": {"name": {"type": "string", "minLength": 1}}
//!     }),
//!     Some("users.post.invalid"),
//! )
//! .unwrap();
//!
//! let app: Router = Router::new().route("/users", post(|| async { "created" }));
//! let app = validate_user.apply(app);
//! let app = ErrorRoutes::new(MessageCatalog::new(json!({
//!     "users": {"post": {"conflict": "Email already registered"}}
//! })))
//! .apply(app);
//! ```

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod form;
pub mod image;
pub mod middleware;
pub mod path;
pub mod registry;

pub use catalog::MessageCatalog;
pub use config::{ConfigError, SchemaSet, ValidationConfig};
pub use dispatch::{ErrorReport, ErrorRoutes, Rejected};
pub use error::{BoxError, Cause, ErrorKind, Rejection, ValidationError, Violation, Violations};
pub use form::{CompiledSchema, FormError, FormValidator};
pub use middleware::{custom, schema, Interceptor, Validate, ValidationRequest, Verdict};
pub use path::{DataPath, PathSegment};
pub use registry::{RegistryBuilder, RegistryError, ValidatorRegistry};

/// Type alias for accumulating form validation results.
pub type FormResult<T> = stillwater::Validation<T, Violations>;
