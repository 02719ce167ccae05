//! Request validation middleware.
//!
//! An [`Interceptor`] wraps a validation function and installs it in front of
//! an axum [`Router`](axum::Router). [`custom`] accepts any function of the
//! request view; [`schema`] builds one from a JSON Schema.

mod interceptor;
mod request;

pub use interceptor::{custom, schema, Interceptor, Validate, Verdict, DEFAULT_BODY_LIMIT};
pub(crate) use interceptor::schema_validator;
pub use request::{BodyError, ValidationRequest};
