//! Middleware: wrappers and their composition.
//!
//! A [`Wrapper`] turns one handler into another that pre- and post-processes
//! the request and response around it. [`compose`] stacks a list of wrappers
//! around a base handler.
//!
//! # Order
//!
//! Each wrapper in the list becomes the new **outermost** layer:
//!
//! ```text
//! compose(base, [A, B, C])
//!
//!   request  ──▶ C ──▶ B ──▶ A ──▶ base
//!   response ◀── C ◀── B ◀── A ◀──┘
//! ```
//!
//! The *last* wrapper sees the request first and the response last. Put
//! [`Recovery`] last so it guards everything inside it; put [`Throttle`]
//! before [`Auth`] in the list if unauthenticated requests must not consume
//! admission slots.
//!
//! Built-in wrappers:
//! - [`Auth`]: bearer JWT verification with an optional gatekeeper
//! - [`Throttle`]: paced admission with timeout
//! - [`Recovery`]: turns handler panics into `500`
//! - [`Logging`]: one line per request in, one per response out
//! - [`Cors`]: `Access-Control-*` headers and preflight answers
//! - [`ETag`]: a fixed entity tag with `304` for matching `GET`s

mod auth;
mod cors;
mod etag;
mod logging;
mod recovery;
mod throttle;

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;

pub use auth::{Auth, AuthHandler, BoxError, Gatekeeper};
pub use cors::{Cors, CorsHandler};
pub use etag::{ETag, ETagHandler};
pub use logging::{Logging, LoggingHandler};
pub use recovery::{Recovery, RecoveryHandler};
pub use throttle::{Throttle, ThrottleHandler};

/// Wraps a handler with another handler.
pub trait Wrapper: Send + Sync {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler;
}

impl<W: Wrapper + ?Sized> Wrapper for Box<W> {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        (**self).wrap(inner)
    }
}

impl<W: Wrapper + ?Sized> Wrapper for Arc<W> {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        (**self).wrap(inner)
    }
}

impl<W: Wrapper + ?Sized> Wrapper for &W {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        (**self).wrap(inner)
    }
}

/// Wraps `base` with every wrapper in order; the last one ends up outermost.
///
/// ```rust
/// use strata::middleware::{compose, Logging, Recovery, Wrapper};
/// use strata::log::TracingLogger;
/// use strata::Request;
///
/// async fn app(_: Request) -> &'static str { "ok" }
///
/// let logger = TracingLogger::shared();
/// let wrappers: Vec<Box<dyn Wrapper>> = vec![
///     Box::new(Logging::new(logger.clone())),
///     Box::new(Recovery::new(logger)),        // outermost
/// ];
/// let handler = compose(app, wrappers);
/// ```
pub fn compose<I>(base: impl Handler, wrappers: I) -> BoxedHandler
where
    I: IntoIterator,
    I::Item: Wrapper,
{
    wrappers
        .into_iter()
        .fold(Arc::new(base) as BoxedHandler, |inner, wrapper| wrapper.wrap(inner))
}

/// An ordered list of wrappers around a base handler, built up step by step.
///
/// `Chain::new(base).with(a).with(b).build()` equals `compose(base, [a, b])`:
/// `b` is outermost.
pub struct Chain {
    base: BoxedHandler,
    wrappers: Vec<Box<dyn Wrapper>>,
}

impl Chain {
    pub fn new(base: impl Handler) -> Self {
        Self { base: Arc::new(base), wrappers: Vec::new() }
    }

    /// Adds `wrapper` as the new outermost layer.
    pub fn with(mut self, wrapper: impl Wrapper + 'static) -> Self {
        self.wrappers.push(Box::new(wrapper));
        self
    }

    pub fn len(&self) -> usize { self.wrappers.len() }
    pub fn is_empty(&self) -> bool { self.wrappers.is_empty() }

    pub fn build(self) -> BoxedHandler {
        self.wrappers
            .into_iter()
            .fold(self.base, |inner, wrapper| wrapper.wrap(inner))
    }
}

/// Adapts a closure `Fn(Request, BoxedHandler) -> Future` into a
/// [`Wrapper`]. The closure receives the inner handler with every request
/// and decides whether and how to call it.
pub fn wrap_fn<F, Fut>(f: F) -> FnWrapper<F>
where
    F: Fn(Request, BoxedHandler) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = crate::Response> + Send + 'static,
{
    FnWrapper(Arc::new(f))
}

/// See [`wrap_fn`].
pub struct FnWrapper<F>(Arc<F>);

impl<F, Fut> Wrapper for FnWrapper<F>
where
    F: Fn(Request, BoxedHandler) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = crate::Response> + Send + 'static,
{
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(FnLayer { f: Arc::clone(&self.0), inner })
    }
}

struct FnLayer<F> {
    f: Arc<F>,
    inner: BoxedHandler,
}

impl<F, Fut> Handler for FnLayer<F>
where
    F: Fn(Request, BoxedHandler) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = crate::Response> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        Box::pin((self.f)(req, Arc::clone(&self.inner)))
    }
}
