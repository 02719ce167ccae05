//! Error types for validation failures.
//!
//! This module provides the keyed validation taxonomy, the schema violation
//! records it carries, and the rejection type passed between interceptors and
//! the error routes.

mod rejection;
mod validation;
mod violation;

pub use rejection::Rejection;
pub use validation::{BoxError, Cause, ErrorKind, ValidationError};
pub use violation::{Violation, Violations};
