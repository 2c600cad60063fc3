//! The logging capability stages report through.
//!
//! Every stage that logs takes a [`SharedLogger`] in its constructor; there
//! is no process-wide default. [`TracingLogger`] forwards to [`tracing`],
//! which is what a service normally wants. Tests pass a closure to capture
//! lines:
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use strata::log::{Level, SharedLogger};
//!
//! let lines = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&lines);
//! let logger: SharedLogger = Arc::new(move |_: Level, msg: &str| {
//!     sink.lock().unwrap().push(msg.to_owned());
//! });
//! logger.log(Level::INFO, "GET /api/users");
//! assert_eq!(lines.lock().unwrap().len(), 1);
//! ```

use std::sync::Arc;

pub use tracing::Level;

/// Receives one formatted line per event.
pub trait Logger: Send + Sync + 'static {
    fn log(&self, level: Level, message: &str);
}

/// A logger shared by all requests flowing through a stage.
pub type SharedLogger = Arc<dyn Logger>;

impl<F> Logger for F
where
    F: Fn(Level, &str) + Send + Sync + 'static,
{
    fn log(&self, level: Level, message: &str) {
        (self)(level, message)
    }
}

/// Emits every line as a `tracing` event with target `strata`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn shared() -> SharedLogger {
        Arc::new(Self)
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        // `tracing` macros need the level as a constant.
        match level {
            Level::ERROR => tracing::error!(target: "strata", "{message}"),
            Level::WARN  => tracing::warn!(target: "strata", "{message}"),
            Level::INFO  => tracing::info!(target: "strata", "{message}"),
            Level::DEBUG => tracing::debug!(target: "strata", "{message}"),
            _            => tracing::trace!(target: "strata", "{message}"),
        }
    }
}
