//! Incoming HTTP request type.

use bytes::Bytes;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue};
use tokio::time::Instant;

use crate::resource::ResourcePath;

/// An incoming HTTP request as seen by every stage of the pipeline.
///
/// Stages never rewrite the method, path, or headers of a request they pass
/// on. The only thing a stage adds is typed data in [`extensions`]
/// (the auth guard stores the verified [`Claims`](crate::jwt::Claims) there).
///
/// [`extensions`]: Request::extensions
pub struct Request {
    pub(crate) method: http::Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) deadline: Option<Instant>,
    pub(crate) extensions: Extensions,
}

impl Request {
    /// Creates a request with no headers and an empty body.
    ///
    /// ```rust
    /// use strata::Request;
    ///
    /// let req = Request::new(http::Method::GET, "/api/users/42");
    /// assert_eq!(req.path(), "/api/users/42");
    /// ```
    pub fn new(method: http::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            deadline: None,
            extensions: Extensions::new(),
        }
    }

    /// Appends a header value. Repeated names keep every value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the point in time after which waiting stages give up on this
    /// request. The throttle answers `503` once it passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn method(&self) -> &http::Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn deadline(&self) -> Option<Instant> { self.deadline }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Case-insensitive header lookup. Returns the first value if the header
    /// is repeated, `None` if it is missing or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parses the request path into its resources below `prefix`.
    ///
    /// The router never hands IDs to handlers; this is how a handler gets them:
    ///
    /// ```rust
    /// use strata::Request;
    ///
    /// let req = Request::new(http::Method::GET, "/api/users/42/posts/7");
    /// let resources = req.resources("/api/");
    /// assert_eq!(resources.id_of("users"), Some("42"));
    /// assert_eq!(resources.id_of("posts"), Some("7"));
    /// ```
    pub fn resources(&self, prefix: &str) -> ResourcePath {
        ResourcePath::parse(&self.path, prefix)
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            headers: parts.headers,
            body,
            deadline: None,
            extensions: parts.extensions,
        }
    }
}
