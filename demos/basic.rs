//! Nested resources behind JWT auth, a throttle, and panic recovery.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/users/42
//!   curl -X PUT http://localhost:3000/api/users/42 -H "authorization: Bearer $TOKEN"
//!   curl http://localhost:3000/api/users/42/posts/7
//!   curl http://localhost:3000/api/boom

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use strata::jwt::TokenCache;
use strata::log::TracingLogger;
use strata::middleware::{compose, Auth, Cors, Logging, Recovery, Throttle, Wrapper};
use strata::{Method, MethodDispatcher, Request, Response, Router, Server};

const PREFIX: &str = "/api/";

#[tokio::main]
async fn main() -> Result<(), strata::Error> {
    tracing_subscriber::fmt::init();
    let logger = TracingLogger::shared();

    let auth = Auth::new(logger.clone())
        .key("secret")
        .cache(Arc::new(TokenCache::new()))
        .gatekeeper(|req, claims| {
            if req.method() == http::Method::DELETE && claims.get_str("role") != Some("admin") {
                return Err("only admins delete users".into());
            }
            Ok(())
        });

    let router = Router::new(PREFIX, logger.clone());
    router.register(
        "users",
        MethodDispatcher::strict(logger.clone())
            .on(Method::Get, get_user)
            .on(Method::Put, auth.wrap(strata::boxed(update_user)))
            .on(Method::Delete, auth.wrap(strata::boxed(delete_user))),
    )?;
    router.register("users/posts", MethodDispatcher::new(get_post))?;
    router.register("boom", boom)?;

    let wrappers: Vec<Box<dyn Wrapper>> = vec![
        Box::new(Throttle::new(50.0, logger.clone())?.timeout(Duration::from_millis(500))),
        Box::new(Logging::new(logger.clone())),
        Box::new(
            Cors::new()
                .allow_origin("*")
                .allow_methods([Method::Get, Method::Put, Method::Delete])
                .allow_headers("authorization, content-type")
                .max_age(Duration::from_secs(600)),
        ),
        Box::new(Recovery::new(logger)),
    ];

    Server::bind("0.0.0.0:3000")?
        .request_timeout(Duration::from_secs(5))
        .serve(compose(router, wrappers))
        .await
}

async fn get_user(req: Request) -> Response {
    match req.resources(PREFIX).id_of("users") {
        Some(id) => Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#)),
        None => Response::json(r#"[{"id":"42","name":"alice"}]"#),
    }
}

async fn update_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::status(StatusCode::NO_CONTENT)
}

async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn get_post(req: Request) -> Response {
    let resources = req.resources(PREFIX);
    let user = resources.id_of("users").unwrap_or("?");
    let post = resources.id_of("posts").unwrap_or("?");
    Response::text(format!("post {post} of user {user}"))
}

async fn boom(_req: Request) -> Response {
    panic!("boom was requested")
}
