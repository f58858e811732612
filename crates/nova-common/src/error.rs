//! Unified error type for the nova action pipeline.
//!
//! Every failure that can cross the executor boundary is funneled into
//! [`Error`], which carries enough context for a transport layer to derive an
//! HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in nova.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A collaborator or option is missing or invalid, or an operation was
    /// invoked against a collaborator that was never configured.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request was malformed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request inputs failed validation.
    #[error("Invalid inputs: {0}")]
    InvalidInputs(String),

    /// The caller lacks permission for the requested action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested entity could not be found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is not allowed on the target resource.
    #[error("Not allowed: {0}")]
    NotAllowed(String),

    /// The requested representation cannot be produced.
    #[error("Not acceptable: {0}")]
    NotAcceptable(String),

    /// The request body has an unsupported content type.
    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    /// The target resource is not ready yet.
    #[error("Not ready: {0}")]
    NotReady(String),

    /// A rate limit was exceeded.
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// The transactional store failed.
    #[error("Store error: {source}")]
    Store {
        /// The underlying store error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The cache backend failed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Handing tasks to the dispatcher failed.
    #[error("Dispatch error [{queue}]: {message}")]
    Dispatch {
        /// Queue the task was destined for.
        queue: String,
        /// Human-readable error description.
        message: String,
    },

    /// Sending notices failed.
    #[error("Notify error: {0}")]
    Notify(String),

    /// An action failed before it completed.
    #[error("Failed to execute {action} action: {source}")]
    ActionFailed {
        /// Name of the action that failed.
        action: String,
        /// What went wrong.
        #[source]
        source: Box<Error>,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::BadRequest(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::InvalidInputs(_) => 402,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::NotAllowed(_) => 405,
            Error::NotAcceptable(_) => 406,
            Error::UnsupportedContent(_) => 415,
            Error::NotReady(_) => 425,
            Error::TooManyRequests(_) => 429,
            Error::ActionFailed { source, .. } => source.http_status(),
            Error::Config(_)
            | Error::Store { .. }
            | Error::Cache(_)
            | Error::Dispatch { .. }
            | Error::Notify(_)
            | Error::Internal(_) => 500,
        }
    }

    /// `true` for 4xx errors caused by the caller.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }

    /// `true` for 5xx errors caused by the server or its collaborators.
    pub fn is_server_error(&self) -> bool {
        self.http_status() >= 500
    }

    /// Strip any [`Error::ActionFailed`] wrappers and return the root error.
    pub fn root(&self) -> &Error {
        match self {
            Error::ActionFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Convenience constructor for [`Error::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Convenience constructor for [`Error::Store`].
    pub fn store(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Store {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Cache`].
    pub fn cache(msg: impl Into<String>) -> Self {
        Error::Cache(msg.into())
    }

    /// Convenience constructor for [`Error::Dispatch`].
    pub fn dispatch(queue: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Dispatch {
            queue: queue.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Notify`].
    pub fn notify(msg: impl Into<String>) -> Self {
        Error::Notify(msg.into())
    }

    /// Convenience constructor for [`Error::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Wrap `source` as the failure of the named action.
    pub fn action_failed(action: impl Into<String>, source: Error) -> Self {
        Error::ActionFailed {
            action: action.into(),
            source: Box::new(source),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInputs(err.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn config_display() {
        let err = Error::config("dispatcher is not available");
        assert_eq!(
            err.to_string(),
            "Configuration error: dispatcher is not available"
        );
        assert_eq!(err.http_status(), 500);
        assert!(err.is_server_error());
    }

    #[test]
    fn client_statuses() {
        assert_eq!(Error::BadRequest("x".into()).http_status(), 400);
        assert_eq!(Error::Unauthorized("x".into()).http_status(), 401);
        assert_eq!(Error::InvalidInputs("x".into()).http_status(), 402);
        assert_eq!(Error::Forbidden("x".into()).http_status(), 403);
        assert_eq!(Error::NotFound("x".into()).http_status(), 404);
        assert_eq!(Error::NotAllowed("x".into()).http_status(), 405);
        assert_eq!(Error::NotAcceptable("x".into()).http_status(), 406);
        assert_eq!(Error::UnsupportedContent("x".into()).http_status(), 415);
        assert_eq!(Error::NotReady("x".into()).http_status(), 425);
        assert_eq!(Error::TooManyRequests("x".into()).http_status(), 429);
        assert!(Error::NotFound("x".into()).is_client_error());
    }

    #[test]
    fn action_failed_wraps_message() {
        let err = Error::action_failed("createUser", Error::Unauthorized("bad token".into()));
        assert_eq!(
            err.to_string(),
            "Failed to execute createUser action: Unauthorized: bad token"
        );
        // Status follows the wrapped error.
        assert_eq!(err.http_status(), 401);
        assert_matches!(err.root(), Error::Unauthorized(_));
    }

    #[test]
    fn store_display() {
        let err = Error::store("connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn dispatch_display() {
        let err = Error::dispatch("emails", "queue is full");
        assert_eq!(err.to_string(), "Dispatch error [emails]: queue is full");
    }

    #[test]
    fn json_errors_are_invalid_inputs() {
        let err: Error = serde_json::from_str::<u32>("\"abc\"").unwrap_err().into();
        assert_matches!(err, Error::InvalidInputs(_));
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);

        fn err_fn() -> Result<i32> {
            Err(Error::internal("boom"))
        }
        assert!(err_fn().is_err());
    }
}
