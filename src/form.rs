//! Schema-based form validation.
//!
//! This module wraps the `jsonschema` evaluator. Evaluation is delegated
//! entirely; the wrapper only reshapes the evaluator's ordered error list
//! into [`Violations`] and never alters the verdict.

use std::fmt;

use jsonschema::error::ValidationErrorKind;
use jsonschema::ValidationError;
use serde_json::Value;
use stillwater::Validation;

use crate::error::{Violation, Violations};
use crate::path::DataPath;
use crate::FormResult;

/// Errors raised when a schema itself cannot be used.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FormError {
    /// The schema definition failed to compile.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

/// A schema compiled once and reused across payloads.
///
/// Format assertions (`date-time`, `email`, `uri`, ...) are enabled.
///
/// # Example
///
/// ```rust
/// use reqguard::CompiledSchema;
/// use serde_json::json;
///
/// let schema = CompiledSchema::compile(&json!({
///     "type": "object",
///     "properties": {"name": {"type": "string"}}
/// })).unwrap();
///
/// assert!(schema.violations(&json!({"name": "Ada"})).is_none());
///
/// let violations = schema.violations(&json!({"name": 1})).unwrap();
/// assert_eq!(violations.first().data_path.to_string(), "/name");
/// ```
pub struct CompiledSchema {
    definition: Value,
    validator: jsonschema::Validator,
}

impl CompiledSchema {
    /// Compiles a schema definition.
    ///
    /// # Errors
    ///
    /// Returns `FormError::InvalidSchema` if the evaluator rejects the schema.
    pub fn compile(definition: &Value) -> Result<Self, FormError> {
        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(definition)
            .map_err(|e| FormError::InvalidSchema(e.to_string()))?;

        Ok(Self {
            definition: definition.clone(),
            validator,
        })
    }

    /// Returns the evaluator's violations in reporting order, or `None` when
    /// the payload complies.
    pub fn violations(&self, payload: &Value) -> Option<Violations> {
        let violations = self
            .validator
            .iter_errors(payload)
            .map(|error| to_violation(&self.definition, &error))
            .collect();

        Violations::from_vec(violations)
    }

    /// Whether the payload complies.
    pub fn is_valid(&self, payload: &Value) -> bool {
        self.validator.is_valid(payload)
    }

    /// The schema definition this was compiled from.
    pub fn definition(&self) -> &Value {
        &self.definition
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Generic form data validator.
///
/// Stateless; each call compiles the schema it is given. Use
/// [`CompiledSchema`] directly when the same schema validates many payloads.
///
/// # Example
///
/// ```rust
/// use reqguard::FormValidator;
/// use serde_json::json;
///
/// let schema = json!({
///     "required": ["name"],
///     "properties": {"name": {"type": "string", "minLength": 5, "maxLength": 10}}
/// });
///
/// let validator = FormValidator::new();
/// assert!(validator.assert_valid(&json!({"name": "Inside"}), &schema).unwrap().is_none());
/// assert!(validator.assert_valid(&json!({"name": "Duck"}), &schema).unwrap().is_some());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FormValidator;

impl FormValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks a payload against a schema.
    ///
    /// Returns `Ok(None)` when the payload complies and `Ok(Some(violations))`
    /// with the evaluator's full, untransformed list otherwise.
    ///
    /// # Errors
    ///
    /// Returns `FormError::InvalidSchema` if the schema cannot be compiled.
    pub fn assert_valid(
        &self,
        payload: &Value,
        schema: &Value,
    ) -> Result<Option<Violations>, FormError> {
        Ok(CompiledSchema::compile(schema)?.violations(payload))
    }

    /// Like [`assert_valid`](Self::assert_valid), shaped as a `Validation` so
    /// results from several payloads can be accumulated.
    pub fn validate(
        &self,
        payload: &Value,
        schema: &Value,
    ) -> Result<FormResult<()>, FormError> {
        Ok(match self.assert_valid(payload, schema)? {
            None => Validation::Success(()),
            Some(violations) => Validation::Failure(violations),
        })
    }
}

/// Builds a violation from one evaluator error.
///
/// The failing keyword is the last segment of the schema path; its schema
/// value becomes the single message parameter. Only local `$ref`s are
/// followed when looking that value up, so keywords reached through a remote
/// reference carry no params.
fn to_violation(definition: &Value, error: &ValidationError<'_>) -> Violation {
    let schema_path = error.schema_path.to_string();
    let keyword = schema_path.rsplit('/').next().unwrap_or_default();
    let violation = Violation::new(
        DataPath::parse_pointer(&error.instance_path.to_string()),
        error.to_string(),
    )
    .with_code(violation_code(&error.kind, &schema_path));

    match schema_value(definition, &schema_path) {
        Some(expected) if !keyword.is_empty() => violation.with_param(keyword, expected.clone()),
        _ => violation,
    }
}

/// Walks a keyword location through the definition, resolving `#/...` refs.
fn schema_value<'a>(root: &'a Value, schema_path: &str) -> Option<&'a Value> {
    schema_path.split('/').skip(1).try_fold(root, |node, token| {
        let token = token.replace("~1", "/").replace("~0", "~");
        let next = match node {
            Value::Object(map) => map.get(&token)?,
            Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
            _ => return None,
        };
        match (token.as_str(), next) {
            ("$ref", Value::String(reference)) => root.pointer(reference.strip_prefix('#')?),
            _ => Some(next),
        }
    })
}

/// Numeric classification of an evaluator error.
fn violation_code(kind: &ValidationErrorKind, schema_path: &str) -> u32 {
    use ValidationErrorKind as Kind;

    match kind {
        Kind::Type { .. } => 0,
        Kind::Enum { .. } | Kind::Constant { .. } => 1,
        Kind::AnyOf { .. } => 10,
        Kind::OneOfNotValid { .. } => 11,
        Kind::OneOfMultipleValid { .. } => 12,
        Kind::Not { .. } => 13,
        Kind::MultipleOf { .. } => 100,
        Kind::Minimum { .. } => 101,
        Kind::ExclusiveMinimum { .. } => 102,
        Kind::Maximum { .. } => 103,
        Kind::ExclusiveMaximum { .. } => 104,
        Kind::MinLength { .. } => 200,
        Kind::MaxLength { .. } => 201,
        Kind::Pattern { .. } => 202,
        Kind::MinProperties { .. } => 300,
        Kind::MaxProperties { .. } => 301,
        Kind::Required { .. } if within_dependencies(schema_path) => 304,
        Kind::Required { .. } => 302,
        Kind::AdditionalProperties { .. } | Kind::UnevaluatedProperties { .. } => 303,
        Kind::MinItems { .. } => 400,
        Kind::MaxItems { .. } => 401,
        Kind::UniqueItems { .. } => 402,
        Kind::AdditionalItems { .. } | Kind::UnevaluatedItems { .. } => 403,
        Kind::Format { .. } => 500,
        _ => 1000,
    }
}

fn within_dependencies(schema_path: &str) -> bool {
    schema_path
        .split('/')
        .any(|token| matches!(token, "dependencies" | "dependentRequired" | "dependentSchemas"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn name_schema() -> Value {
        json!({
            "required": ["name"],
            "properties": {
                "name": {"type": "string", "minLength": 5, "maxLength": 10}
            }
        })
    }

    #[test]
    fn test_non_compliant_inputs() {
        let validator = FormValidator::new();
        for input in [
            json!({}),
            json!({"name": 13}),
            json!({"name": "Duck"}),
            json!({"name": "I'm Donald Duck"}),
        ] {
            let violations = validator.assert_valid(&input, &name_schema()).unwrap();
            assert!(violations.map(|v| v.len()).unwrap_or(0) > 0, "{input} should fail");
        }
    }

    #[test]
    fn test_compliant_input() {
        let validator = FormValidator::new();
        let result = validator
            .assert_valid(&json!({"name": "Inside"}), &name_schema())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_type_violation_shape() {
        let schema = CompiledSchema::compile(&json!({
            "type": "object",
            "properties": {"name": {"type": "string"}}
        }))
        .unwrap();

        let violations = schema.violations(&json!({"name": 1})).unwrap();
        let first = violations.first();
        assert_eq!(first.data_path.to_string(), "/name");
        assert_eq!(first.code, 0);
        assert_eq!(first.params["type"], "string");
        assert!(!first.message.is_empty());
    }

    #[test]
    fn test_required_violation_at_root() {
        let schema = CompiledSchema::compile(&name_schema()).unwrap();
        let violations = schema.violations(&json!({})).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations.first().data_path.is_root());
        assert_eq!(violations.first().code, 302);
        assert_eq!(violations.first().params["required"], json!(["name"]));
    }

    #[test]
    fn test_reports_every_violation() {
        let schema = CompiledSchema::compile(&json!({
            "properties": {
                "a": {"type": "string"},
                "b": {"type": "integer"}
            }
        }))
        .unwrap();

        let violations = schema.violations(&json!({"a": 1, "b": "x"})).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations.with_code(0).len(), 2);
    }

    #[test]
    fn test_formats_are_checked() {
        let schema = CompiledSchema::compile(&json!({
            "properties": {"at": {"type": "string", "format": "date-time"}}
        }))
        .unwrap();

        assert!(schema.violations(&json!({"at": "2024-02-30T99:00:00"})).is_some());
        assert!(schema.violations(&json!({"at": "2024-02-01T10:00:00Z"})).is_none());

        let violations = schema.violations(&json!({"at": "yesterday"})).unwrap();
        assert_eq!(violations.first().code, 500);
    }

    #[test]
    fn test_invalid_schema_is_a_fault() {
        let result = FormValidator::new().assert_valid(&json!({}), &json!({"type": 12}));
        assert!(matches!(result, Err(FormError::InvalidSchema(_))));
    }

    #[test]
    fn test_validate_shape() {
        let validator = FormValidator::new();
        assert!(validator
            .validate(&json!({"name": "Inside"}), &name_schema())
            .unwrap()
            .is_success());
        assert!(validator
            .validate(&json!({"name": 1}), &name_schema())
            .unwrap()
            .is_failure());
    }

    #[test]
    fn test_one_of_codes() {
        let schema = CompiledSchema::compile(&json!({
            "oneOf": [{"type": "integer"}, {"type": "number"}]
        }))
        .unwrap();

        assert_eq!(schema.violations(&json!(3)).unwrap().first().code, 12);
        assert_eq!(schema.violations(&json!("three")).unwrap().first().code, 11);
        assert!(schema.violations(&json!(3.5)).is_none());
    }

    #[test]
    fn test_unclassified_keyword() {
        let schema = CompiledSchema::compile(&json!({"contains": {"type": "string"}})).unwrap();
        assert_eq!(schema.violations(&json!([1, 2])).unwrap().first().code, 1000);
    }

    #[test]
    fn test_params_behind_local_ref() {
        let schema = CompiledSchema::compile(&json!({
            "$defs": {"label": {"type": "string", "maxLength": 3}},
            "properties": {"name": {"$ref": "#/$defs/label"}}
        }))
        .unwrap();

        let violations = schema.violations(&json!({"name": "too long"})).unwrap();
        let first = violations.first();
        assert_eq!(first.code, 201);
        assert_eq!(first.params["maxLength"], 3);
    }

    #[test]
    fn test_schema_value_lookup() {
        let root = json!({
            "$defs": {"n": {"minimum": 2}},
            "allOf": [{"$ref": "#/$defs/n"}],
            "properties": {"a/b": {"type": "string"}}
        });

        assert_eq!(schema_value(&root, "/allOf/0/$ref/minimum"), Some(&json!(2)));
        assert_eq!(schema_value(&root, "/properties/a~1b/type"), Some(&json!("string")));
        assert_eq!(schema_value(&root, "/properties/missing/type"), None);
        assert!(within_dependencies("/dependentRequired/bar"));
        assert!(!within_dependencies("/required"));
    }
}
