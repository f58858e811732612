//! Nova - per-request action execution pipeline.
//!
//! An [`Executor`] runs one [`Action`] per request inside a transactional
//! envelope: it rate limits and authenticates the caller, acquires a store
//! connection, runs the action against an [`ActionContext`], commits or rolls
//! back, and then delivers the side effects the action accumulated.

pub mod action;
pub mod config;
pub mod context;
pub mod effects;
pub mod executor;
pub mod registry;
pub mod services;
pub mod suppression;

pub use action::{Action, ActionKey, Adapter, Outcome};
pub use config::{AcquireOptions, ExecutorOptions, RateLimits, RateOptions};
pub use context::ActionContext;
pub use effects::{Notice, NoticeFilter, SideEffect, Task};
pub use executor::{Executor, ExecutorBuilder};
pub use nova_common::{parse, validate, Error, OperationId, Result, SuppressionTag};
pub use services::{
    AuthInputs, Authenticator, Cache, CloseAction, Connection, Dispatcher, Logger, NoopLogger,
    Notifier, QueueMessage, RateLimiter, Requestor, Store, TracingLogger, UnavailableCache,
};
