//! Static entity tags.

use std::sync::Arc;

use http::header::{self, HeaderValue};
use http::StatusCode;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::middleware::Wrapper;
use crate::request::Request;
use crate::response::Response;

/// Tags every response with a fixed `ETag`.
///
/// A `GET` whose `If-None-Match` equals the tag is answered `304 Not
/// Modified` without calling the wrapped handler. Suited to content that
/// only changes with a deployment, such as a build id or version string.
#[derive(Clone, Debug)]
pub struct ETag {
    tag: HeaderValue,
}

impl ETag {
    /// Fails if `tag` is not a valid header value.
    pub fn new(tag: &str) -> Result<Self, Error> {
        let tag = HeaderValue::from_str(tag).map_err(|_| Error::InvalidETag(tag.to_owned()))?;
        Ok(Self { tag })
    }
}

impl Wrapper for ETag {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(ETagHandler { tag: self.tag.clone(), inner })
    }
}

/// Built by [`ETag`].
pub struct ETagHandler {
    tag: HeaderValue,
    inner: BoxedHandler,
}

impl Handler for ETagHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let tag = self.tag.clone();
        let fresh = req.method() == http::Method::GET
            && req.headers().get(header::IF_NONE_MATCH) == Some(&tag);
        let fut = (!fresh).then(|| self.inner.call(req));

        Box::pin(async move {
            let mut res = match fut {
                Some(fut) => fut.await,
                None => Response::status(StatusCode::NOT_MODIFIED),
            };
            res.headers_mut().insert(header::ETAG, tag);
            res
        })
    }
}
