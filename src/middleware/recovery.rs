//! Panic isolation.

use std::any::Any;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::Rejection;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::log::{Level, SharedLogger};
use crate::middleware::Wrapper;
use crate::request::Request;

/// Wraps handlers so a panic inside them becomes a `500` for that request
/// only.
///
/// Every request runs the wrapped handler in a task of its own. If that task
/// panics, the panic stays in the task: the message
/// `panic during serving <METHOD> <path>: <cause>` is logged and sent as the
/// response body. Other requests, including ones running concurrently on
/// the same worker thread, are not affected. Dropping the returned future
/// aborts the task, so an abandoned request stops where it is.
#[derive(Clone)]
pub struct Recovery {
    logger: SharedLogger,
}

impl Recovery {
    pub fn new(logger: SharedLogger) -> Self {
        Self { logger }
    }
}

impl Wrapper for Recovery {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(RecoveryHandler { inner, logger: Arc::clone(&self.logger) })
    }
}

/// Built by [`Recovery`].
pub struct RecoveryHandler {
    inner: BoxedHandler,
    logger: SharedLogger,
}

impl Handler for RecoveryHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let inner = Arc::clone(&self.inner);
        let logger = Arc::clone(&self.logger);
        let method = req.method().to_string();
        let path = req.path().to_owned();
        let accept = req.header("accept").map(str::to_owned);

        Box::pin(async move {
            // The handler is called inside the task too, so a panic raised
            // while building its future is caught the same way.
            let mut task = AbortOnDrop(tokio::spawn(async move { inner.call(req).await }));
            let cause = match (&mut task.0).await {
                Ok(res) => return res,
                Err(e) if e.is_panic() => panic_message(e.into_panic()),
                Err(e) => e.to_string(),
            };
            let rejection = Rejection::InternalFault { method, path, cause };
            logger.log(Level::ERROR, &format!("recovery: {rejection}"));
            rejection.respond(accept.as_deref(), logger.as_ref())
        })
    }
}

struct AbortOnDrop(JoinHandle<crate::response::Response>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        // No-op once the task has finished.
        self.0.abort();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
