//! Logger collaborator and its two stock implementations.

use std::time::Duration;

use nova_common::Error;
use serde_json::Value;

/// Structured logging sink used by the executor and exposed to actions.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, error: &Error);

    /// Record a named event with structured properties.
    fn log(&self, event: &str, properties: &Value);

    /// Record a metric sample.
    fn track(&self, metric: &str, value: f64);

    /// Record a call to an external service.
    fn trace(&self, service: &str, command: &str, elapsed: Duration, success: bool);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _error: &Error) {}
    fn log(&self, _event: &str, _properties: &Value) {}
    fn track(&self, _metric: &str, _value: f64) {}
    fn trace(&self, _service: &str, _command: &str, _elapsed: Duration, _success: bool) {}
}

/// Forwards to `tracing`, inheriting whatever span is current.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, error: &Error) {
        tracing::error!(status = error.http_status(), "{error}");
    }

    fn log(&self, event: &str, properties: &Value) {
        tracing::info!(%properties, "{event}");
    }

    fn track(&self, metric: &str, value: f64) {
        tracing::info!(metric, value, "metric");
    }

    fn trace(&self, service: &str, command: &str, elapsed: Duration, success: bool) {
        let elapsed_ms = elapsed.as_millis() as u64;
        if success {
            tracing::debug!(service, command, elapsed_ms, "service call");
        } else {
            tracing::warn!(service, command, elapsed_ms, "service call failed");
        }
    }
}
