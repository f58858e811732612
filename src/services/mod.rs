//! Collaborator interfaces the executor is constructed against.
//!
//! Each collaborator is an abstract capability injected at construction time;
//! nothing in this crate implements a real backend except the loggers.

pub mod auth;
pub mod cache;
pub mod dispatcher;
pub mod limiter;
pub mod logger;
pub mod notifier;
pub mod store;

pub use auth::{AuthInputs, Authenticator, Requestor};
pub use cache::{Cache, UnavailableCache};
pub use dispatcher::{Dispatcher, QueueMessage};
pub use limiter::RateLimiter;
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use notifier::Notifier;
pub use store::{CloseAction, Connection, Store};
