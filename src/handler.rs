//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! Routers, dispatchers, and middleware all hold handlers of *different*
//! concrete types: plain `async fn`s, other middleware, nested routers. Rust
//! collections can only hold one concrete type, so everything is stored as a
//! trait object behind an `Arc`:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.register("users", hello)
//! Arc::new(hello) as BoxedHandler                  ← blanket Handler impl
//!        ↓
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_response() })  ← BoxFuture
//! ```
//!
//! The per-request cost is one `Arc` clone plus one virtual call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` so tokio can move it across worker threads, and so the
/// recovery boundary can hand it to a task of its own.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Anything that turns one request into one response.
///
/// Implemented automatically for every `async fn` (or closure) of the shape
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// and by every stage in this crate: [`Router`](crate::Router),
/// [`MethodDispatcher`](crate::MethodDispatcher), and the handlers produced by
/// the [`middleware`](crate::middleware) wrappers.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

/// Erases a concrete handler into a [`BoxedHandler`].
pub fn boxed(handler: impl Handler) -> BoxedHandler {
    Arc::new(handler)
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        // Calling the function yields the concrete `Fut`; map its output via
        // `IntoResponse` and box it so the return type matches the trait.
        let fut = (self)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Lets an already wrapped handler be registered again, e.g. an
/// [`Auth`](crate::middleware::Auth)-guarded handler as one method of a
/// [`MethodDispatcher`](crate::MethodDispatcher).
impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call(&self, req: Request) -> BoxFuture {
        (**self).call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn hello(_req: Request) -> &'static str {
        "hello"
    }

    #[tokio::test]
    async fn async_fn_is_a_handler() {
        let handler = boxed(hello);
        let res = handler.call(Request::new(http::Method::GET, "/")).await;
        assert_eq!(res.body_text(), "hello");
    }

    #[tokio::test]
    async fn closure_is_a_handler() {
        let greeting = String::from("hi");
        let handler = boxed(move |req: Request| {
            let body = format!("{greeting} {}", req.path());
            async move { body }
        });
        let res = handler.call(Request::new(http::Method::GET, "/there")).await;
        assert_eq!(res.body_text(), "hi /there");
    }

    #[tokio::test]
    async fn boxed_handler_nests() {
        let inner = boxed(hello);
        let outer = boxed(inner);
        let res = outer.call(Request::new(http::Method::GET, "/")).await;
        assert_eq!(res.body_text(), "hello");
    }
}
