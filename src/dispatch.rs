//! Rendering validation errors as HTTP responses.
//!
//! [`ErrorRoutes`] maps each [`ErrorKind`] to a status and a JSON report,
//! translating keys through a [`MessageCatalog`]. Rejections it does not
//! recognize are left untouched for the surrounding application.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;

use crate::catalog::MessageCatalog;
use crate::error::{ErrorKind, Rejection, ValidationError, Violations};

/// The JSON body of a rendered validation error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorReport {
    /// `{code, message}` for every kind except schema errors.
    Message { code: String, message: String },
    /// `{code, errors}` for schema errors, violations in reporting order.
    Schema { code: String, errors: Violations },
}

impl ErrorReport {
    pub fn code(&self) -> &str {
        match self {
            ErrorReport::Message { code, .. } | ErrorReport::Schema { code, .. } => code,
        }
    }
}

/// Marks a response produced from a rejection so an outer [`ErrorRoutes`]
/// layer can re-render it.
#[derive(Debug, Clone)]
pub struct Rejected(pub Arc<Rejection>);

/// The error dispatch chain.
///
/// # Example
///
/// ```rust
/// use axum::http::StatusCode;
/// use reqguard::{ErrorReport, ErrorRoutes, MessageCatalog, ValidationError};
/// use serde_json::json;
///
/// let routes = ErrorRoutes::new(MessageCatalog::new(json!({
///     "test": {"post": {"conflict": "conflict test message"}}
/// })));
///
/// let (status, report) = routes.dispatch(&ValidationError::conflict().with_key("test.post.conflict"));
/// assert_eq!(status, StatusCode::CONFLICT);
/// assert_eq!(report, ErrorReport::Message {
///     code: "test.post.conflict".to_string(),
///     message: "conflict test message".to_string(),
/// });
/// ```
#[derive(Debug, Clone, Default)]
pub struct ErrorRoutes {
    catalog: Arc<MessageCatalog>,
}

impl ErrorRoutes {
    pub fn new(catalog: MessageCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    /// Renders a validation error.
    pub fn dispatch(&self, err: &ValidationError) -> (StatusCode, ErrorReport) {
        let kind = err.kind();
        let code = err.key().to_string();

        let report = match (kind, err.violations()) {
            (ErrorKind::Schema, Some(violations)) => ErrorReport::Schema {
                code,
                errors: violations.clone(),
            },
            (
                ErrorKind::Conflict
                | ErrorKind::Custom
                | ErrorKind::IdMismatch
                | ErrorKind::NotFound
                | ErrorKind::Schema,
                _,
            ) => ErrorReport::Message {
                message: self.catalog.get_or(&code, kind.untranslated()).to_string(),
                code,
            },
        };

        tracing::debug!(%kind, code = report.code(), "dispatching validation error");
        (kind.status(), report)
    }

    /// Renders a rejection, or returns `None` when it is not a validation error.
    pub fn handle(&self, rejection: &Rejection) -> Option<Response> {
        let err = rejection.as_validation()?;
        let (status, report) = self.dispatch(err);
        Some((status, Json(report)).into_response())
    }

    /// Installs the chain around every route of `router`.
    ///
    /// Apply it outside the interceptors so it sees their rejections.
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(from_fn_with_state(self, render))
    }
}

async fn render(State(routes): State<ErrorRoutes>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    match response.extensions().get::<Rejected>().cloned() {
        Some(Rejected(rejection)) => routes.handle(&rejection).unwrap_or(response),
        None => response,
    }
}

impl IntoResponse for Rejection {
    /// Validation errors render with an empty catalog; anything else is a 500.
    /// Both carry [`Rejected`] for an outer [`ErrorRoutes`].
    fn into_response(self) -> Response {
        let mut response = match &self {
            Rejection::Validation(err) => {
                let (status, report) = ErrorRoutes::default().dispatch(err);
                (status, Json(report)).into_response()
            }
            Rejection::Other(err) => {
                tracing::error!(error = %err, "unhandled rejection");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
        response.extensions_mut().insert(Rejected(Arc::new(self)));
        response
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        Rejection::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Violation;
    use crate::path::DataPath;
    use serde_json::json;

    #[test]
    fn test_fallback_messages() {
        let routes = ErrorRoutes::default();

        let (status, report) = routes.dispatch(&ValidationError::not_found());
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"code": "notFound", "message": "Untranslated"})
        );

        let (_, report) = routes.dispatch(&ValidationError::id_mismatch());
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"code": "idMismatch", "message": "Untranslated ID mismatch error"})
        );

        let (status, report) = routes.dispatch(&ValidationError::custom());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"code": "custom", "message": "Untranslated custom error"})
        );
    }

    #[test]
    fn test_schema_report() {
        let violations = Violations::single(
            Violation::new(DataPath::from_field("name"), "wrong type")
                .with_code(0)
                .with_param("type", json!("string")),
        );
        let (status, report) = ErrorRoutes::default().dispatch(&ValidationError::schema(violations));

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "code": "schema",
                "errors": [{
                    "message": "wrong type",
                    "params": {"type": "string"},
                    "code": 0,
                    "dataPath": "/name"
                }]
            })
        );
    }

    #[test]
    fn test_schema_report_ignores_detail() {
        let violations = Violations::single(Violation::new(DataPath::from_field("age"), "too small"));
        let err = ValidationError::schema(violations).with_detail(json!({"note": "x"}));
        let (_, report) = ErrorRoutes::default().dispatch(&err);

        let rendered = serde_json::to_value(&report).unwrap();
        assert_eq!(rendered["errors"][0]["dataPath"], "/age");
        assert!(rendered.get("message").is_none());
    }

    #[test]
    fn test_catalog_translation() {
        let routes = ErrorRoutes::new(MessageCatalog::new(json!({
            "users": {"put": {"id": "ids differ"}}
        })));
        let (_, report) = routes.dispatch(&ValidationError::id_mismatch().with_key("users.put.id"));
        assert_eq!(
            report,
            ErrorReport::Message {
                code: "users.put.id".to_string(),
                message: "ids differ".to_string()
            }
        );
    }

    #[test]
    fn test_unrecognized_rejection_passes() {
        let rejection = Rejection::other(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(ErrorRoutes::default().handle(&rejection).is_none());
    }

    #[test]
    fn test_every_kind_has_a_response() {
        let routes = ErrorRoutes::default();
        for kind in ErrorKind::ALL {
            let rejection = Rejection::from(ValidationError::new(kind, None));
            let response = routes.handle(&rejection).unwrap();
            assert_eq!(response.status(), kind.status());
        }
    }

    #[test]
    fn test_rejection_response_is_marked() {
        let response = ValidationError::conflict().into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(response.extensions().get::<Rejected>().is_some());

        let response = Rejection::other("boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<Rejected>().is_some());
    }
}
