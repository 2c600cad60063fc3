//! Error types.
//!
//! Two families:
//!
//! - [`Error`]: infrastructure and configuration failures surfaced to the
//!   code that builds or runs the pipeline: binding a port, registering a bad
//!   route, configuring an impossible rate.
//! - [`Rejection`]: the outcome of a stage refusing one request. A rejection
//!   never propagates as a Rust error; the stage that produced it turns it
//!   into a response on the spot.

use http::header::{self, HeaderValue};
use http::StatusCode;

use crate::body::{self, Feedback};
use crate::jwt::JwtError;
use crate::log::{Level, Logger};
use crate::method::Method;
use crate::response::Response;

/// The error type returned by strata's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    InvalidAddr(String),

    #[error("invalid route `{skeleton}`: {reason}")]
    InvalidRoute { skeleton: String, reason: String },

    #[error("route `{0}` is already registered")]
    DuplicateRoute(String),

    #[error("invalid throttle rate {0}: must be a positive, finite number of events per second")]
    InvalidRate(f64),

    #[error("invalid entity tag `{0}`: not a valid header value")]
    InvalidETag(String),
}

/// Why a stage refused to pass a request on.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("no resource registered for {path}")]
    RouteNotFound { path: String },

    #[error("method {method} not supported by {path}")]
    MethodUnsupported { method: String, path: String, allowed: Vec<Method> },

    #[error("missing token: {0}")]
    AuthMissingToken(#[source] JwtError),

    #[error("{0}")]
    AuthInvalidSignature(#[source] JwtError),

    #[error("token claims not valid: 'nbf' and/or 'exp' outside the accepted window")]
    AuthTemporalInvalid,

    #[error("access rejected by gatekeeper: {0}")]
    AuthPolicyRejected(String),

    #[error("admission timeout while serving {method} {path}: no slot before the deadline")]
    AdmissionTimeout { method: String, path: String },

    #[error("panic during serving {method} {path}: {cause}")]
    InternalFault { method: String, path: String, cause: String },
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. }     => StatusCode::NOT_FOUND,
            Self::MethodUnsupported { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::AuthMissingToken(_)
            | Self::AuthInvalidSignature(_)
            | Self::AuthPolicyRejected(_)  => StatusCode::UNAUTHORIZED,
            Self::AuthTemporalInvalid      => StatusCode::FORBIDDEN,
            Self::AdmissionTimeout { .. }  => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalFault { .. }     => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the response for this rejection, encoding the feedback body
    /// per `accept`.
    ///
    /// If no body can be produced the failure goes to `logger` and the status
    /// is sent with an empty body. An internal fault falls back to plain text
    /// instead, so the diagnostic always reaches the client.
    pub fn respond(&self, accept: Option<&str>, logger: &dyn Logger) -> Response {
        let status = self.status();
        let feedback = Feedback::new(status, self.to_string());
        let mut res = match body::write_feedback(status, accept, &feedback) {
            Ok(res) => res,
            Err(e) => {
                logger.log(Level::WARN, &format!("cannot write {} feedback: {e}", status.as_u16()));
                match self {
                    Self::InternalFault { .. } => body::write_feedback(status, None, &feedback)
                        .unwrap_or_else(|_| Response::status(status)),
                    _ => Response::status(status),
                }
            }
        };
        if let Self::MethodUnsupported { allowed, .. } = self {
            let allow: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
            if let Ok(value) = HeaderValue::from_str(&allow.join(", ")) {
                res.headers_mut().insert(header::ALLOW, value);
            }
        }
        res
    }
}
