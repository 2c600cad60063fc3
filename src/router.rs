//! Nested resource router.
//!
//! Routes on the request's resource **skeleton**, the names of
//! `{prefix}/{resource}/{id}/{subresource}/{subresource-id}/…` with IDs
//! dropped. One radix tree keyed by skeleton, exact matches only: no prefix
//! matching, no wildcards. Handlers get the original request and parse IDs
//! themselves with [`Request::resources`](crate::Request::resources).

use std::sync::Arc;

use matchit::Router as MatchitRouter;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Rejection};
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::log::SharedLogger;
use crate::request::Request;
use crate::resource::{self, ResourcePath};

/// Maps resource skeletons to handlers.
///
/// Registration takes `&self`: the table sits behind a read-preferring lock,
/// so routes can be added while the router is already serving. Requests
/// only hold the read lock long enough to clone the matched handler out.
///
/// ```rust
/// use strata::{Request, Router};
/// use strata::log::TracingLogger;
///
/// # async fn users(_: Request) -> &'static str { "" }
/// # async fn posts(_: Request) -> &'static str { "" }
/// let router = Router::new("/api/", TracingLogger::shared());
/// router.register("users", users).unwrap();
/// router.register("users/posts", posts).unwrap();
/// // GET /api/users/42/posts/7 → posts
/// ```
pub struct Router {
    prefix: String,
    routes: RwLock<MatchitRouter<BoxedHandler>>,
    logger: SharedLogger,
}

impl Router {
    /// Creates a router mounted at `prefix`. Requests outside it are not found.
    pub fn new(prefix: impl Into<String>, logger: SharedLogger) -> Self {
        Self { prefix: prefix.into(), routes: RwLock::new(MatchitRouter::new()), logger }
    }

    pub fn prefix(&self) -> &str { &self.prefix }

    /// Registers `handler` for `skeleton`, a `/`-joined list of resource
    /// names such as `"users/posts"`. `""` is the mount point itself.
    ///
    /// Fails on a skeleton that is already registered or that contains empty
    /// names or the `{`, `}`, `*` characters.
    pub fn register(&self, skeleton: &str, handler: impl Handler) -> Result<(), Error> {
        let invalid = |reason: &str| Error::InvalidRoute {
            skeleton: skeleton.to_owned(),
            reason: reason.to_owned(),
        };
        if !skeleton.is_empty() && skeleton.split('/').any(str::is_empty) {
            return Err(invalid("empty resource name"));
        }
        if skeleton.contains(['{', '}', '*']) {
            return Err(invalid("resource names cannot contain `{`, `}` or `*`"));
        }

        let key = route_key(skeleton);
        let mut routes = self.routes.write();
        if routes.at(&key).is_ok() {
            return Err(Error::DuplicateRoute(skeleton.to_owned()));
        }
        routes
            .insert(key, Arc::new(handler) as BoxedHandler)
            .map_err(|e| invalid(&e.to_string()))?;
        debug!(prefix = %self.prefix, skeleton, "resource registered");
        Ok(())
    }

    /// Looks up the handler for a request path.
    pub fn resolve(&self, path: &str) -> Option<BoxedHandler> {
        resource::strip_prefix(path, &self.prefix)?;
        let key = route_key(&ResourcePath::parse(path, &self.prefix).skeleton());
        let routes = self.routes.read();
        let matched = routes.at(&key).ok()?;
        Some(Arc::clone(matched.value))
    }
}

impl Handler for Router {
    fn call(&self, req: Request) -> BoxFuture {
        match self.resolve(req.path()) {
            Some(handler) => handler.call(req),
            None => {
                let rejection = Rejection::RouteNotFound { path: req.path().to_owned() };
                let res = rejection.respond(req.header("accept"), self.logger.as_ref());
                Box::pin(async move { res })
            }
        }
    }
}

/// matchit wants absolute paths; the skeleton `""` becomes `/`.
fn route_key(skeleton: &str) -> String {
    format!("/{skeleton}")
}
