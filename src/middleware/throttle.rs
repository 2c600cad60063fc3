//! Paced admission of requests.

use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::time::Instant;

use crate::error::{Error, Rejection};
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::log::{Level, SharedLogger};
use crate::middleware::Wrapper;
use crate::request::Request;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Admits at most `rate` requests per second, one at a time.
///
/// Admissions are spaced `1 / rate` apart, measured between admissions: a
/// request that finishes quickly does not let the next one in early. A
/// request waits for its slot up to the configured timeout or its own
/// [deadline](Request::deadline), whichever comes first, and is answered
/// with `503 Service Unavailable` when that passes. Without either it waits
/// as long as it takes.
///
/// Every handler built by one `Throttle` shares its limiter.
///
/// ```rust
/// use std::time::Duration;
/// use strata::middleware::Throttle;
/// use strata::log::TracingLogger;
///
/// let throttle = Throttle::new(5.0, TracingLogger::shared())
///     .unwrap()
///     .timeout(Duration::from_millis(20));
/// ```
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<Limiter>,
    timeout: Option<Duration>,
    logger: SharedLogger,
}

impl Throttle {
    /// `rate` is in events per second and may be fractional (`0.5` admits
    /// one request every two seconds).
    pub fn new(rate: f64, logger: SharedLogger) -> Result<Self, Error> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::InvalidRate(rate));
        }
        let period = Duration::try_from_secs_f64(1.0 / rate).map_err(|_| Error::InvalidRate(rate))?;
        // Burst stays at the quota's default of one.
        let quota = Quota::with_period(period).ok_or(Error::InvalidRate(rate))?;
        Ok(Self { limiter: Arc::new(RateLimiter::direct(quota)), timeout: None, logger })
    }

    /// Gives up on a slot after `timeout`. `Duration::ZERO` means no timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    fn give_up_at(&self, req: &Request) -> Option<Instant> {
        let by_timeout = self.timeout.map(|t| Instant::now() + t);
        match (by_timeout, req.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

impl Wrapper for Throttle {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(ThrottleHandler { config: self.clone(), inner })
    }
}

/// Built by [`Throttle`].
pub struct ThrottleHandler {
    config: Throttle,
    inner: BoxedHandler,
}

impl Handler for ThrottleHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let limiter = Arc::clone(&self.config.limiter);
        let logger = Arc::clone(&self.config.logger);
        let inner = Arc::clone(&self.inner);
        let give_up_at = self.config.give_up_at(&req);

        Box::pin(async move {
            // Dropping `until_ready` before it resolves consumes no slot.
            let admitted = match give_up_at {
                Some(at) => tokio::time::timeout_at(at, limiter.until_ready()).await.is_ok(),
                None => {
                    limiter.until_ready().await;
                    true
                }
            };
            if admitted {
                return inner.call(req).await;
            }
            let rejection = Rejection::AdmissionTimeout {
                method: req.method().to_string(),
                path: req.path().to_owned(),
            };
            logger.log(Level::WARN, &format!("throttle: {rejection}"));
            rejection.respond(req.header("accept"), logger.as_ref())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn quiet() -> SharedLogger {
        Arc::new(|_: Level, _: &str| {})
    }

    fn ok_handler() -> BoxedHandler {
        Arc::new(|_req: Request| async { StatusCode::OK })
    }

    #[test]
    fn rejects_impossible_rates() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(Throttle::new(rate, quiet()), Err(Error::InvalidRate(_))));
        }
        assert!(Throttle::new(0.5, quiet()).is_ok());
    }

    #[tokio::test]
    async fn second_request_waits_for_pacing_interval() {
        let handler = Throttle::new(10.0, quiet()).unwrap().wrap(ok_handler());
        let begin = std::time::Instant::now();
        for _ in 0..3 {
            let res = handler.call(Request::new(http::Method::GET, "/")).await;
            assert_eq!(res.status_code(), StatusCode::OK);
        }
        // First admission is immediate, the next two wait ~100ms each.
        assert!(begin.elapsed() >= Duration::from_millis(180), "{:?}", begin.elapsed());
    }

    #[tokio::test]
    async fn timeout_rejects_with_503() {
        let throttle = Throttle::new(1.0, quiet()).unwrap().timeout(Duration::from_millis(20));
        let handler = throttle.wrap(ok_handler());
        let first = handler.call(Request::new(http::Method::GET, "/a")).await;
        assert_eq!(first.status_code(), StatusCode::OK);

        let second = handler.call(Request::new(http::Method::POST, "/b")).await;
        assert_eq!(second.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(second.body_text().contains("POST /b"));
    }

    #[tokio::test]
    async fn request_deadline_also_bounds_the_wait() {
        let handler = Throttle::new(1.0, quiet()).unwrap().wrap(ok_handler());
        handler.call(Request::new(http::Method::GET, "/")).await;

        let req = Request::new(http::Method::GET, "/late")
            .with_deadline(Instant::now() + Duration::from_millis(10));
        let res = handler.call(req).await;
        assert_eq!(res.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn abandoned_wait_leaves_slot_intact() {
        let throttle = Throttle::new(5.0, quiet()).unwrap().timeout(Duration::from_millis(10));
        let handler = throttle.wrap(ok_handler());
        assert_eq!(handler.call(Request::new(http::Method::GET, "/")).await.status_code(), StatusCode::OK);
        assert_eq!(
            handler.call(Request::new(http::Method::GET, "/")).await.status_code(),
            StatusCode::SERVICE_UNAVAILABLE,
        );
        tokio::time::sleep(Duration::from_millis(220)).await;
        assert_eq!(handler.call(Request::new(http::Method::GET, "/")).await.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrapped_handlers_share_the_limiter() {
        let throttle = Throttle::new(1.0, quiet()).unwrap().timeout(Duration::from_millis(10));
        let a = throttle.wrap(ok_handler());
        let b = throttle.wrap(ok_handler());
        assert_eq!(a.call(Request::new(http::Method::GET, "/")).await.status_code(), StatusCode::OK);
        assert_eq!(
            b.call(Request::new(http::Method::GET, "/")).await.status_code(),
            StatusCode::SERVICE_UNAVAILABLE,
        );
    }
}
