use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use super::request::{declares_json, BodyError, ValidationRequest};
use crate::error::{Rejection, ValidationError};
use crate::form::{CompiledSchema, FormError};

/// Default cap on buffered request bodies: 2 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// The outcome of a validator: decided now, or once a future resolves.
///
/// Both forms are treated identically by the interceptor.
pub enum Verdict {
    Ready(Result<(), Rejection>),
    Pending(BoxFuture<'static, Result<(), Rejection>>),
}

impl Verdict {
    /// The request may proceed.
    pub fn pass() -> Self {
        Verdict::Ready(Ok(()))
    }

    /// The request is rejected.
    pub fn reject(rejection: impl Into<Rejection>) -> Self {
        Verdict::Ready(Err(rejection.into()))
    }

    /// Defers the decision to `fut`.
    pub fn pending<F, E>(fut: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<Rejection>,
    {
        Verdict::Pending(fut.map(|result| result.map_err(Into::into)).boxed())
    }

    /// Waits for the decision.
    pub async fn resolve(self) -> Result<(), Rejection> {
        match self {
            Verdict::Ready(result) => result,
            Verdict::Pending(fut) => fut.await,
        }
    }
}

impl fmt::Debug for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Verdict::Pending(_) => f.write_str("Pending"),
        }
    }
}

impl From<()> for Verdict {
    fn from(_: ()) -> Self {
        Verdict::pass()
    }
}

impl From<Option<ValidationError>> for Verdict {
    fn from(error: Option<ValidationError>) -> Self {
        match error {
            None => Verdict::pass(),
            Some(err) => Verdict::reject(err),
        }
    }
}

impl From<ValidationError> for Verdict {
    fn from(error: ValidationError) -> Self {
        Verdict::reject(error)
    }
}

impl From<Rejection> for Verdict {
    fn from(rejection: Rejection) -> Self {
        Verdict::reject(rejection)
    }
}

impl From<Result<(), ValidationError>> for Verdict {
    fn from(result: Result<(), ValidationError>) -> Self {
        Verdict::Ready(result.map_err(Rejection::from))
    }
}

impl From<Result<(), Rejection>> for Verdict {
    fn from(result: Result<(), Rejection>) -> Self {
        Verdict::Ready(result)
    }
}

/// A request validator.
///
/// Implemented for every `Fn(&ValidationRequest) -> impl Into<Verdict>`.
pub trait Validate: Send + Sync + 'static {
    fn validate(&self, request: &ValidationRequest) -> Verdict;
}

impl<F, R> Validate for F
where
    F: Fn(&ValidationRequest) -> R + Send + Sync + 'static,
    R: Into<Verdict>,
{
    fn validate(&self, request: &ValidationRequest) -> Verdict {
        self(request).into()
    }
}

/// A validator installed as request middleware.
///
/// On success the request continues to the inner service exactly once; on
/// failure the inner service never runs and the rejection is rendered
/// instead (see [`ErrorRoutes`](crate::ErrorRoutes)).
///
/// # Example
///
/// ```rust
/// use axum::{routing::post, Router};
/// use reqguard::{custom, ErrorRoutes, MessageCatalog, ValidationError, ValidationRequest};
///
/// let check_id = custom(|req: &ValidationRequest| {
///     (req.body().get("id").is_none()).then(ValidationError::id_mismatch)
/// });
///
/// let app: Router = Router::new().route("/users", post(|| async { "created" }));
/// let app = ErrorRoutes::new(MessageCatalog::empty()).apply(check_id.apply(app));
/// ```
#[derive(Clone)]
pub struct Interceptor {
    validator: Arc<dyn Validate>,
    body_limit: usize,
}

impl Interceptor {
    pub fn new<V: Validate>(validator: V) -> Self {
        Self {
            validator: Arc::new(validator),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Sets the largest request body the interceptor buffers.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Runs the validator against a request view.
    pub async fn check(&self, request: &ValidationRequest) -> Result<(), Rejection> {
        self.validator.validate(request).resolve().await
    }

    /// Installs the interceptor on every route of `router`.
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(from_fn_with_state(self, intercept))
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

async fn intercept(State(interceptor): State<Interceptor>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    // Only JSON bodies are buffered; anything else streams through untouched.
    let (view, body) = if declares_json(&parts.headers) {
        let bytes = match axum::body::to_bytes(body, interceptor.body_limit).await {
            Ok(bytes) => bytes,
            Err(err) => return body_error(BodyError::Read(err)),
        };
        match ValidationRequest::from_parts(&parts, &bytes) {
            Ok(view) => (view, Body::from(bytes)),
            Err(err) => return body_error(err),
        }
    } else {
        (ValidationRequest::from_head(&parts), body)
    };

    match interceptor.check(&view).await {
        Ok(()) => next.run(Request::from_parts(parts, body)).await,
        Err(rejection) => {
            tracing::debug!(uri = %view.uri(), error = %rejection, "request rejected");
            rejection.into_response()
        }
    }
}

fn body_error(err: BodyError) -> Response {
    tracing::warn!(error = %err, "unusable request body");
    (StatusCode::BAD_REQUEST, err.to_string()).into_response()
}

/// Wraps a validation function as an [`Interceptor`].
///
/// `validate` may return anything convertible to a [`Verdict`]: `()`,
/// `Option<ValidationError>`, a `Result`, or a [`Verdict::pending`] future.
pub fn custom<F, R>(validate: F) -> Interceptor
where
    F: Fn(&ValidationRequest) -> R + Send + Sync + 'static,
    R: Into<Verdict>,
{
    Interceptor::new(validate)
}

/// Builds an interceptor that checks request data against a JSON Schema.
///
/// `GET` and `HEAD` requests are checked through their query parameters,
/// everything else through the JSON body. Failures become schema errors keyed
/// by `error_key`, or `schema` when none is given.
///
/// # Errors
///
/// Returns `FormError::InvalidSchema` if the schema does not compile.
pub fn schema(definition: &Value, error_key: Option<&str>) -> Result<Interceptor, FormError> {
    let compiled = CompiledSchema::compile(definition)?;
    Ok(Interceptor::new(schema_validator(
        Arc::new(compiled),
        error_key.map(str::to_owned),
    )))
}

pub(crate) fn schema_validator(compiled: Arc<CompiledSchema>, key: Option<String>) -> impl Validate {
    move |req: &ValidationRequest| {
        let payload = req.payload();
        tracing::debug!(uri = %req.uri(), %payload, "validating request data against schema");

        compiled.violations(payload).map(|violations| {
            let err = ValidationError::schema(violations);
            match &key {
                Some(key) => err.with_key(key.clone()),
                None => err,
            }
        })
    }
}
