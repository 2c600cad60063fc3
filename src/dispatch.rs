//! Per-method dispatch for one resource.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Rejection;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::log::SharedLogger;
use crate::method::Method;
use crate::request::Request;

/// Sends each request to the handler registered for its method, or to a
/// default path.
///
/// The table is fixed at construction: which methods a resource handles is
/// known before the first request arrives, and nothing is inspected at
/// request time beyond one map lookup. Methods outside [`Method`]'s
/// capability set always take the default path.
///
/// ```rust
/// use strata::{Method, MethodDispatcher, Request};
///
/// async fn update(_: Request) -> &'static str { "updated" }
/// async fn other(_: Request) -> &'static str { "default" }
///
/// let users = MethodDispatcher::new(other)
///     .on(Method::Put, update);
/// ```
pub struct MethodDispatcher {
    table: BTreeMap<Method, BoxedHandler>,
    fallback: Fallback,
}

enum Fallback {
    Handler(BoxedHandler),
    NotAllowed(SharedLogger),
}

impl MethodDispatcher {
    /// Dispatcher whose unregistered methods go to `default`.
    pub fn new(default: impl Handler) -> Self {
        Self { table: BTreeMap::new(), fallback: Fallback::Handler(Arc::new(default)) }
    }

    /// Dispatcher whose unregistered methods are answered with
    /// `405 Method Not Allowed` and an `Allow` header.
    pub fn strict(logger: SharedLogger) -> Self {
        Self { table: BTreeMap::new(), fallback: Fallback::NotAllowed(logger) }
    }

    /// Registers the handler for `method`, replacing any earlier one.
    pub fn on(mut self, method: Method, handler: impl Handler) -> Self {
        self.table.insert(method, Arc::new(handler));
        self
    }

    /// Methods with a dedicated handler, in a stable order.
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.table.keys().copied()
    }
}

impl Handler for MethodDispatcher {
    fn call(&self, req: Request) -> BoxFuture {
        if let Some(handler) = Method::from_http(req.method()).and_then(|m| self.table.get(&m)) {
            return handler.call(req);
        }
        match &self.fallback {
            Fallback::Handler(default) => default.call(req),
            Fallback::NotAllowed(logger) => {
                let rejection = Rejection::MethodUnsupported {
                    method: req.method().to_string(),
                    path: req.path().to_owned(),
                    allowed: self.methods().collect(),
                };
                let res = rejection.respond(req.header("accept"), logger.as_ref());
                Box::pin(async move { res })
            }
        }
    }
}
