//! Request/response log lines.

use std::sync::Arc;
use std::time::Instant;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::log::{Level, SharedLogger};
use crate::middleware::Wrapper;
use crate::request::Request;

/// Logs `METHOD path` at INFO when a request enters and
/// `METHOD path -> status (elapsed)` when its response leaves.
#[derive(Clone)]
pub struct Logging {
    logger: SharedLogger,
    level: Level,
}

impl Logging {
    pub fn new(logger: SharedLogger) -> Self {
        Self { logger, level: Level::INFO }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Wrapper for Logging {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(LoggingHandler { config: self.clone(), inner })
    }
}

/// Built by [`Logging`].
pub struct LoggingHandler {
    config: Logging,
    inner: BoxedHandler,
}

impl Handler for LoggingHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let Logging { logger, level } = self.config.clone();
        let line = format!("{} {}", req.method(), req.path());
        logger.log(level, &line);
        // Handlers may do work before handing back their future.
        let started = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let res = fut.await;
            logger.log(
                level,
                &format!("{line} -> {} ({:?})", res.status_code().as_u16(), started.elapsed()),
            );
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn logs_request_and_response() {
        let lines = Arc::new(Mutex::new(Vec::<(Level, String)>::new()));
        let sink = Arc::clone(&lines);
        let logger: SharedLogger =
            Arc::new(move |level: Level, msg: &str| sink.lock().push((level, msg.to_owned())));

        let handler = Logging::new(logger)
            .level(Level::DEBUG)
            .wrap(Arc::new(|_req: Request| async { StatusCode::ACCEPTED }));
        let res = handler.call(Request::new(http::Method::POST, "/jobs/1")).await;
        assert_eq!(res.status_code(), StatusCode::ACCEPTED);

        let lines = lines.lock();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (Level::DEBUG, "POST /jobs/1".to_owned()));
        assert!(lines[1].1.starts_with("POST /jobs/1 -> 202 ("), "{}", lines[1].1);
    }

    struct SlowToStart;

    impl Handler for SlowToStart {
        fn call(&self, _req: Request) -> BoxFuture {
            std::thread::sleep(std::time::Duration::from_millis(30));
            Box::pin(async { crate::response::Response::status(StatusCode::OK) })
        }
    }

    #[tokio::test]
    async fn elapsed_covers_the_whole_call() {
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let logger: SharedLogger = Arc::new(move |_: Level, msg: &str| sink.lock().push(msg.to_owned()));

        Logging::new(logger).wrap(Arc::new(SlowToStart)).call(Request::new(http::Method::GET, "/")).await;

        let last = lines.lock()[1].clone();
        let elapsed = last
            .strip_prefix("GET / -> 200 (")
            .and_then(|rest| rest.strip_suffix("ms)"))
            .and_then(|ms| ms.parse::<f64>().ok())
            .unwrap_or_else(|| panic!("unexpected line {last}"));
        assert!(elapsed >= 30.0, "{last}");
    }
}
