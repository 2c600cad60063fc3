//! Cross-origin resource sharing headers.

use std::sync::Arc;
use std::time::Duration;

use http::header::{self, HeaderName, HeaderValue};
use http::StatusCode;
use tracing::warn;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::Wrapper;
use crate::request::Request;
use crate::response::Response;

/// Adds the configured `Access-Control-*` headers to every response.
///
/// An `OPTIONS` request is a preflight: it is answered here with `204` and
/// the headers, and the wrapped handler is not called. Unset fields add no
/// header.
///
/// ```rust
/// use std::time::Duration;
/// use strata::Method;
/// use strata::middleware::Cors;
///
/// let cors = Cors::new()
///     .allow_origin("https://app.example.com")
///     .allow_methods([Method::Get, Method::Post])
///     .max_age(Duration::from_secs(600));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Cors {
    origin: Option<String>,
    methods: Vec<Method>,
    headers: Option<String>,
    expose: Option<String>,
    max_age: Option<Duration>,
}

impl Cors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn allow_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Comma-separated request header names, sent as given.
    pub fn allow_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    /// Comma-separated response header names, sent as given.
    pub fn expose_headers(mut self, headers: impl Into<String>) -> Self {
        self.expose = Some(headers.into());
        self
    }

    /// Sent in whole seconds, rounded to the nearest.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    fn header_list(&self) -> Vec<(HeaderName, HeaderValue)> {
        let methods = (!self.methods.is_empty()).then(|| {
            self.methods.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
        });
        let max_age = self.max_age.map(|d| d.as_secs_f64().round().to_string());
        let fields = [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, self.origin.clone()),
            (header::ACCESS_CONTROL_ALLOW_METHODS, methods),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, self.headers.clone()),
            (header::ACCESS_CONTROL_EXPOSE_HEADERS, self.expose.clone()),
            (header::ACCESS_CONTROL_MAX_AGE, max_age),
        ];

        fields
            .into_iter()
            .filter_map(|(name, value)| {
                let value = value?;
                match HeaderValue::from_str(&value) {
                    Ok(v) => Some((name, v)),
                    Err(_) => {
                        warn!(header = %name, value = %value, "cors: skipping invalid header value");
                        None
                    }
                }
            })
            .collect()
    }
}

impl Wrapper for Cors {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(CorsHandler { headers: Arc::new(self.header_list()), inner })
    }
}

/// Built by [`Cors`].
pub struct CorsHandler {
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
    inner: BoxedHandler,
}

impl Handler for CorsHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let headers = Arc::clone(&self.headers);
        let preflight = req.method() == http::Method::OPTIONS;
        let fut = (!preflight).then(|| self.inner.call(req));

        Box::pin(async move {
            let mut res = match fut {
                Some(fut) => fut.await,
                None => Response::status(StatusCode::NO_CONTENT),
            };
            for (name, value) in headers.iter() {
                res.headers_mut().insert(name.clone(), value.clone());
            }
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cors() -> Cors {
        Cors::new()
            .allow_origin("http://testhost/")
            .allow_methods([Method::Get, Method::Post])
            .allow_headers("X-Test-Allow-Header")
            .expose_headers("X-Test-Expose-Header")
            .max_age(Duration::from_secs(30 * 60))
    }

    fn content() -> BoxedHandler {
        Arc::new(|_req: Request| async { "content" })
    }

    async fn unreachable(_req: Request) -> Response {
        panic!("preflight reached the handler")
    }

    fn assert_headers(res: &Response) {
        assert_eq!(res.header("access-control-allow-origin"), Some("http://testhost/"));
        assert_eq!(res.header("access-control-allow-methods"), Some("GET, POST"));
        assert_eq!(res.header("access-control-allow-headers"), Some("X-Test-Allow-Header"));
        assert_eq!(res.header("access-control-expose-headers"), Some("X-Test-Expose-Header"));
        assert_eq!(res.header("access-control-max-age"), Some("1800"));
    }

    #[tokio::test]
    async fn preflight_is_answered_without_the_handler() {
        let handler = cors().wrap(Arc::new(unreachable));
        let res = handler.call(Request::new(http::Method::OPTIONS, "/")).await;
        assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
        assert!(res.body().is_empty());
        assert_headers(&res);
    }

    #[tokio::test]
    async fn other_methods_get_headers_and_content() {
        let res = cors().wrap(content()).call(Request::new(http::Method::GET, "/")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body_text(), "content");
        assert_headers(&res);
    }

    #[tokio::test]
    async fn unset_fields_add_nothing() {
        let res = Cors::new()
            .allow_origin("*")
            .wrap(content())
            .call(Request::new(http::Method::GET, "/"))
            .await;
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
        assert_eq!(res.header("access-control-allow-methods"), None);
        assert_eq!(res.header("access-control-max-age"), None);
    }

    #[test]
    fn invalid_values_are_skipped() {
        let headers = Cors::new().allow_origin("bad\norigin").allow_headers("X-Ok").header_list();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].0, header::ACCESS_CONTROL_ALLOW_HEADERS);
    }
}
