//! # strata
//!
//! Layered request handling for HTTP services: a resource router, per-method
//! dispatch, and composable middleware around plain async handlers.
//!
//! ## Pieces
//!
//! - [`Router`]: routes `/{prefix}/{resource}/{id}/{subresource}/…` by the
//!   resource names only; IDs are left for the handler
//!   ([`Request::resources`]).
//! - [`MethodDispatcher`]: one handler per HTTP method, plus a default.
//! - [`middleware`]: [`Wrapper`](middleware::Wrapper)s composed around any
//!   handler. JWT authentication, a throttle, panic recovery, and request
//!   logging are built in.
//! - [`Server`]: serves any handler over HTTP/1.1 and HTTP/2 with graceful
//!   shutdown on SIGTERM / Ctrl-C.
//!
//! Every piece is a [`Handler`], so they nest freely.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use strata::log::TracingLogger;
//! use strata::middleware::{compose, Recovery, Throttle, Wrapper};
//! use strata::{Method, MethodDispatcher, Request, Response, Router, Server};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), strata::Error> {
//!     let logger = TracingLogger::shared();
//!
//!     let router = Router::new("/api/", logger.clone());
//!     router.register(
//!         "users",
//!         MethodDispatcher::strict(logger.clone())
//!             .on(Method::Get, get_user)
//!             .on(Method::Post, create_user),
//!     )?;
//!
//!     let wrappers: Vec<Box<dyn Wrapper>> = vec![
//!         Box::new(Throttle::new(100.0, logger.clone())?.timeout(Duration::from_secs(1))),
//!         Box::new(Recovery::new(logger)),
//!     ];
//!     Server::bind("0.0.0.0:3000")?.serve(compose(router, wrappers)).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let resources = req.resources("/api/");
//!     match resources.id_of("users") {
//!         Some(id) => Response::json(format!(r#"{{"id":"{id}"}}"#)),
//!         None => Response::json("[]"),
//!     }
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::status(StatusCode::CREATED)
//! }
//! ```

mod dispatch;
mod error;
mod handler;
mod method;
mod request;
mod resource;
mod response;
mod router;
mod server;

pub mod body;
pub mod jwt;
pub mod log;
pub mod middleware;

pub use dispatch::MethodDispatcher;
pub use error::{Error, Rejection};
pub use handler::{boxed, BoxFuture, BoxedHandler, Handler};
pub use method::{Method, UnknownMethod};
pub use request::Request;
pub use resource::{Resource, ResourcePath};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
