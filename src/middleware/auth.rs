//! Bearer-token authentication guard.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::Rejection;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::jwt::{self, Claims, Key, Token, TokenCache};
use crate::log::{Level, SharedLogger};
use crate::middleware::Wrapper;
use crate::request::Request;
use crate::response::Response;

/// Error type a gatekeeper rejects with. Its message is shown to the client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Authorization policy run after the token is known to be authentic and
/// current.
pub type Gatekeeper = Arc<dyn Fn(&Request, &Claims) -> Result<(), BoxError> + Send + Sync>;

/// Configuration of the authentication guard; wraps handlers as a
/// [`Wrapper`].
///
/// Defaults: no cache, no key (tokens are decoded but their signature is not
/// checked), a leeway of one minute, no gatekeeper.
///
/// ```rust
/// use strata::middleware::Auth;
/// use strata::log::TracingLogger;
///
/// let auth = Auth::new(TracingLogger::shared())
///     .key("secret")
///     .gatekeeper(|_req, claims| match claims.get_str("access") {
///         Some("allowed") => Ok(()),
///         _ => Err("access is not allowed".into()),
///     });
/// ```
///
/// A request that passes carries its [`Claims`] in the request extensions.
#[derive(Clone)]
pub struct Auth {
    cache: Option<Arc<TokenCache>>,
    key: Option<Key>,
    leeway: Duration,
    gatekeeper: Option<Gatekeeper>,
    logger: SharedLogger,
}

impl Auth {
    pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(60);

    pub fn new(logger: SharedLogger) -> Self {
        Self { cache: None, key: None, leeway: Self::DEFAULT_LEEWAY, gatekeeper: None, logger }
    }

    /// Shares decode/verify results across requests (and across guards
    /// holding the same cache).
    pub fn cache(mut self, cache: Arc<TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Verifies token signatures with `key`.
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Clock-skew tolerance applied to `nbf` and `exp`.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn gatekeeper<F>(mut self, gatekeeper: F) -> Self
    where
        F: Fn(&Request, &Claims) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.gatekeeper = Some(Arc::new(gatekeeper));
        self
    }

    fn resolve(&self, raw: &str) -> Result<Token, jwt::JwtError> {
        match (&self.cache, &self.key) {
            (Some(cache), Some(key)) => cache.verify(raw, key),
            (Some(cache), None)      => cache.decode(raw),
            (None, Some(key))        => Token::verify(raw, key),
            (None, None)             => Token::decode(raw),
        }
    }

    /// Runs the checks in order: credential present, token authentic,
    /// claims current, gatekeeper satisfied.
    fn authorize(&self, req: &Request) -> Result<Claims, Rejection> {
        let raw = jwt::bearer_token(req).map_err(Rejection::AuthMissingToken)?;
        let token = self.resolve(raw).map_err(Rejection::AuthInvalidSignature)?;
        if !token.is_valid_at(Utc::now(), self.leeway) {
            return Err(Rejection::AuthTemporalInvalid);
        }
        if let Some(gatekeeper) = &self.gatekeeper {
            gatekeeper(req, token.claims())
                .map_err(|reason| Rejection::AuthPolicyRejected(reason.to_string()))?;
        }
        Ok(token.claims().clone())
    }
}

impl Wrapper for Auth {
    fn wrap(&self, inner: BoxedHandler) -> BoxedHandler {
        Arc::new(AuthHandler { config: self.clone(), inner })
    }
}

/// A handler only reachable with a valid token. Built by [`Auth`].
pub struct AuthHandler {
    config: Auth,
    inner: BoxedHandler,
}

impl AuthHandler {
    fn deny(&self, req: &Request, rejection: Rejection) -> Response {
        self.config.logger.log(
            Level::DEBUG,
            &format!("auth: denied {} {}: {rejection}", req.method(), req.path()),
        );
        rejection.respond(req.header("accept"), self.config.logger.as_ref())
    }
}

impl Handler for AuthHandler {
    fn call(&self, mut req: Request) -> BoxFuture {
        match self.config.authorize(&req) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                self.inner.call(req)
            }
            Err(rejection) => {
                let res = self.deny(&req, rejection);
                Box::pin(async move { res })
            }
        }
    }
}
