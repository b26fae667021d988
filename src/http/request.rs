//! Framework-agnostic HTTP request and response types.

use std::collections::HashMap;
use std::fmt;

use crate::secret::Secret;

/// Name of the header carrying credentials. Its value is never logged.
pub const AUTHORIZATION: &str = "authorization";

/// An authenticated user or service principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Unique identifier for this principal
    pub id: String,
    /// Display name
    pub name: String,
}

/// An incoming HTTP request, as seen by middleware.
///
/// This type contains simple, owned data so it does not couple to any
/// specific server's request types. Header names are stored lowercased and
/// looked up case-insensitively.
///
/// # Examples
///
/// ```
/// use pipeline_bus::http::{Principal, Request};
///
/// let mut request = Request::new("req-12345".to_string(), "POST", "/invoices");
/// request.add_header("Content-Type".to_string(), "application/json".to_string());
/// request.add_header("Authorization".to_string(), "Bearer t0k3n".to_string());
/// request.set_principal(Some(Principal {
///     id: "user-1".to_string(),
///     name: "Alice".to_string(),
/// }));
///
/// assert_eq!(request.header("content-type"), Some("application/json"));
/// assert_eq!(format!("{}", request.authorization().unwrap()), "[REDACTED]");
/// assert!(!format!("{:?}", request).contains("t0k3n"));
/// ```
#[derive(Clone)]
pub struct Request {
    request_id: String,
    method: String,
    path: String,
    headers: HashMap<String, String>,
    query_params: HashMap<String, String>,
    body: Vec<u8>,
    principal: Option<Principal>,
}

impl Request {
    /// Creates a request with an empty header set, no query parameters,
    /// no body and no principal.
    pub fn new(request_id: String, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id,
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            query_params: HashMap::new(),
            body: Vec::new(),
            principal: None,
        }
    }

    /// Sets the authenticated principal for this request.
    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    /// Adds a header. The name is stored lowercased.
    pub fn add_header(&mut self, key: String, value: String) {
        self.headers.insert(key.to_ascii_lowercase(), value);
    }

    /// Adds a query parameter.
    pub fn add_query_param(&mut self, key: String, value: String) {
        self.query_params.insert(key, value);
    }

    /// Replaces the request body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns a header value by case-insensitive name.
    ///
    /// The `Authorization` header is not readable here; use
    /// [`authorization`](Self::authorization).
    pub fn header(&self, name: &str) -> Option<&str> {
        let key = name.to_ascii_lowercase();
        if key == AUTHORIZATION {
            return None;
        }
        self.headers.get(&key).map(String::as_str)
    }

    /// Returns true if the header is present, including `Authorization`.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    /// Returns the `Authorization` header wrapped in a [`Secret`].
    pub fn authorization(&self) -> Option<Secret<String>> {
        self.headers
            .get(AUTHORIZATION)
            .map(|v| Secret::new(v.clone()))
    }

    /// Returns a query parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(String::as_str)
    }

    /// Returns the raw body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the principal, if present.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let shown = if k == AUTHORIZATION { "[REDACTED]" } else { v.as_str() };
                (k.as_str(), shown)
            })
            .collect();
        headers.sort_unstable();

        f.debug_struct("Request")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &headers)
            .field("query_params", &self.query_params)
            .field("body_len", &self.body.len())
            .field("principal", &self.principal)
            .finish()
    }
}

/// An HTTP response produced by a handler or a short-circuiting middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: String,
}

impl Response {
    /// A `200 OK` response with `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    /// A response with the given status code and body.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header, stored lowercased.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Returns the status code.
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Returns a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns true for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
