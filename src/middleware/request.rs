use axum::extract::Query;
use axum::http::{header, HeaderMap, Method, Uri};
use serde_json::{Map, Value};

/// Errors turning a raw request body into JSON.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The body could not be read, e.g. because it exceeds the size limit.
    #[error("unable to read request body: {0}")]
    Read(#[source] axum::Error),

    /// The body is not valid JSON.
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

/// The view of an HTTP request that validators inspect.
///
/// Query parameters are decoded into a JSON object of strings; the body is
/// decoded as JSON, with an empty body standing in for `{}`.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Value,
    body: Value,
}

impl ValidationRequest {
    /// Creates a request with an empty body. Query parameters come from `uri`.
    pub fn new(method: Method, uri: Uri) -> Self {
        let query = query_object(&uri);
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            query,
            body: Value::Object(Map::new()),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Builds the view from request parts and a buffered JSON body.
    pub(crate) fn from_parts(
        parts: &axum::http::request::Parts,
        bytes: &[u8],
    ) -> Result<Self, BodyError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::from_head(parts));
        }
        let body = serde_json::from_slice(bytes).map_err(BodyError::InvalidJson)?;
        Ok(Self::from_head(parts).with_body(body))
    }

    /// Builds the view from request parts alone; the body is seen as `{}`.
    pub(crate) fn from_head(parts: &axum::http::request::Parts) -> Self {
        Self::new(parts.method.clone(), parts.uri.clone()).with_headers(parts.headers.clone())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Query parameters as a JSON object of strings.
    pub fn query(&self) -> &Value {
        &self.query
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Whether the method only reads (`GET` or `HEAD`).
    pub fn is_read(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// The data a schema applies to: query parameters for reads, the body
    /// otherwise.
    pub fn payload(&self) -> &Value {
        if self.is_read() {
            &self.query
        } else {
            &self.body
        }
    }
}

fn query_object(uri: &Uri) -> Value {
    let pairs = match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => pairs,
        Err(err) => {
            tracing::debug!(error = %err, "ignoring malformed query string");
            Vec::new()
        }
    };

    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    )
}

/// A missing content type counts as JSON.
pub(crate) fn declares_json(headers: &HeaderMap) -> bool {
    match headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        None => true,
        Some(content_type) => {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            essence == "application/json" || essence.ends_with("+json")
        }
    }
}
