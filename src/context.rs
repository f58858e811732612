//! Per-invocation context shared by an action and all of its sub-actions.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nova_common::{validate, Error, OperationId, Result, SuppressionTag};
use parking_lot::Mutex;

use crate::action::{Action, ActionKey, Outcome};
use crate::effects::{Notice, NoticeFilter, SideEffect, Task};
use crate::registry::MergeRegistry;
use crate::services::{Cache, Connection, Logger, NoopLogger, UnavailableCache};
use crate::suppression::SuppressionRegistry;

/// A deferred sub-action with its input, erased to the context's connection
/// type.
#[async_trait]
pub(crate) trait DeferredCall<C: Connection>: Send {
    fn key(&self) -> ActionKey;

    async fn call(self: Box<Self>, ctx: &ActionContext<C>) -> Result<()>;
}

struct Deferred<C: Connection, A: Action<C>> {
    action: Arc<A>,
    input: A::Input,
    _connection: PhantomData<fn() -> C>,
}

#[async_trait]
impl<C: Connection, A: Action<C>> DeferredCall<C> for Deferred<C, A> {
    fn key(&self) -> ActionKey {
        ActionKey::of::<A>()
    }

    async fn call(self: Box<Self>, ctx: &ActionContext<C>) -> Result<()> {
        let Deferred { action, input, .. } = *self;
        ctx.logger
            .debug(&format!("Started deferred {} action", action.name()));
        action.execute(ctx, input).await?.into_result().map(drop)
    }
}

/// Mutable state accumulated while the invocation runs.
struct Ledger<C: Connection> {
    tasks: Option<MergeRegistry<Task>>,
    notices: Option<MergeRegistry<Notice>>,
    invalidated: BTreeSet<String>,
    deferred: Vec<Box<dyn DeferredCall<C>>>,
    suppressed: SuppressionRegistry,
}

/// Context handed to an action and every sub-action it runs.
///
/// Owns the invocation's store connection and collects side effects: tasks
/// and notices to deliver, cache keys to invalidate, and deferred sub-actions
/// to run after commit. Every method takes `&self` so deferred sub-actions can
/// share one context concurrently.
pub struct ActionContext<C: Connection> {
    operation: OperationId,
    action: &'static str,
    connection: C,
    cache: Arc<dyn Cache>,
    logger: Arc<dyn Logger>,
    timestamp: DateTime<Utc>,
    ledger: Mutex<Ledger<C>>,
    sealed: AtomicBool,
}

impl<C: Connection> ActionContext<C> {
    /// Create a context around `connection`.
    ///
    /// Task and notice registration are disabled until enabled with
    /// [`with_tasks`](Self::with_tasks) and [`with_notices`](Self::with_notices).
    pub fn new(connection: C) -> Self {
        Self {
            operation: OperationId::new(),
            action: "",
            connection,
            cache: Arc::new(UnavailableCache),
            logger: Arc::new(NoopLogger),
            timestamp: Utc::now(),
            ledger: Mutex::new(Ledger {
                tasks: None,
                notices: None,
                invalidated: BTreeSet::new(),
                deferred: Vec::new(),
                suppressed: SuppressionRegistry::new(),
            }),
            sealed: AtomicBool::new(false),
        }
    }

    /// Builder: set the operation id.
    pub fn with_operation(mut self, operation: OperationId) -> Self {
        self.operation = operation;
        self
    }

    /// Builder: set the name of the primary action.
    pub fn with_action(mut self, action: &'static str) -> Self {
        self.action = action;
        self
    }

    /// Builder: set the cache.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    /// Builder: set the logger.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Builder: set the invocation timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Builder: enable or disable task registration.
    pub fn with_tasks(self, enabled: bool) -> Self {
        self.ledger.lock().tasks = enabled.then(MergeRegistry::new);
        self
    }

    /// Builder: enable or disable notice registration.
    pub fn with_notices(self, enabled: bool) -> Self {
        self.ledger.lock().notices = enabled.then(MergeRegistry::new);
        self
    }

    pub fn operation_id(&self) -> OperationId {
        self.operation
    }

    /// Name of the primary action this context was created for.
    pub fn action_name(&self) -> &'static str {
        self.action
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// `true` once the invocation has committed; no more deferrals are accepted.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    // -- Side effects --------------------------------------------------------

    /// Register a task or notice for delivery after commit.
    ///
    /// Descriptors with an empty queue or target are ignored. Fails with
    /// [`Error::Config`] when no dispatcher (for tasks) or notifier (for
    /// notices) was configured.
    pub fn register(&self, effect: impl Into<SideEffect>) -> Result<()> {
        let mut ledger = self.ledger.lock();
        match effect.into() {
            SideEffect::Task(task) => {
                if task.queue.is_empty() {
                    return Ok(());
                }
                let tasks = ledger.tasks.as_mut().ok_or_else(|| {
                    Error::config("Cannot register task: dispatcher is not available")
                })?;
                tasks.register(task);
            }
            SideEffect::Notice(notice) => {
                if notice.target.is_empty() {
                    return Ok(());
                }
                let notices = ledger.notices.as_mut().ok_or_else(|| {
                    Error::config("Cannot register notice: notifier is not available")
                })?;
                notices.register(notice);
            }
        }
        Ok(())
    }

    /// Drop pending notices selected by `filter`; returns how many were dropped.
    ///
    /// An empty filter drops nothing.
    pub fn clear_notices(&self, filter: &NoticeFilter) -> Result<usize> {
        let mut ledger = self.ledger.lock();
        let notices = ledger.notices.as_mut().ok_or_else(|| {
            Error::config("Cannot clear notices: notifier is not available")
        })?;
        if filter.is_empty() {
            return Ok(0);
        }
        Ok(notices.remove_where(|notice| filter.matches(notice)))
    }

    /// Drop every pending deferral of `action`; returns how many were dropped.
    pub fn clear_deferred(&self, action: ActionKey) -> usize {
        let mut ledger = self.ledger.lock();
        let before = ledger.deferred.len();
        ledger.deferred.retain(|call| call.key() != action);
        before - ledger.deferred.len()
    }

    /// Mark a cache key for eviction after commit. Empty keys are ignored.
    pub fn invalidate(&self, key: impl Into<String>) {
        let key = key.into();
        if !key.is_empty() {
            self.ledger.lock().invalidated.insert(key);
        }
    }

    pub fn is_invalid(&self, key: &str) -> bool {
        self.ledger.lock().invalidated.contains(key)
    }

    // -- Sub-actions ---------------------------------------------------------

    /// Run a sub-action inline against this context.
    ///
    /// A suppressed action is skipped and reports a completed default output.
    pub async fn run<A: Action<C>>(
        &self,
        action: &A,
        input: A::Input,
    ) -> Result<Outcome<A::Output>> {
        let suppressed = self
            .ledger
            .lock()
            .suppressed
            .is_suppressed(&ActionKey::of::<A>());
        if suppressed {
            self.logger
                .debug(&format!("Suppressed {} action", action.name()));
            return Ok(Outcome::Completed(A::Output::default()));
        }

        self.logger.debug(&format!("Started {} action", action.name()));
        action.execute(self, input).await
    }

    /// Queue a sub-action to run after the invocation commits.
    ///
    /// Deferred actions run even if the action is suppressed at the time.
    pub fn defer<A: Action<C>>(&self, action: Arc<A>, input: A::Input) -> Result<()> {
        validate::ensure(
            !self.is_sealed(),
            "Cannot defer an action: the context is sealed",
        )?;
        self.ledger.lock().deferred.push(Box::new(Deferred {
            action,
            input,
            _connection: PhantomData,
        }));
        Ok(())
    }

    /// Suppress `actions` under `tag` until the same tag is lifted.
    pub fn suppress(&self, actions: impl IntoIterator<Item = ActionKey>, tag: SuppressionTag) {
        let mut ledger = self.ledger.lock();
        for action in actions {
            ledger.suppressed.suppress(action, tag);
        }
    }

    /// Lift `tag` from `actions`.
    pub fn unsuppress(&self, actions: impl IntoIterator<Item = ActionKey>, tag: SuppressionTag) {
        let mut ledger = self.ledger.lock();
        for action in actions {
            ledger.suppressed.unsuppress(action, tag);
        }
    }

    pub fn is_suppressed(&self, action: ActionKey) -> bool {
        self.ledger.lock().suppressed.is_suppressed(&action)
    }

    // -- Inspection ----------------------------------------------------------

    /// Snapshot of pending tasks in registration order.
    pub fn pending_tasks(&self) -> Vec<Task> {
        let ledger = self.ledger.lock();
        ledger
            .tasks
            .as_ref()
            .map(|tasks| tasks.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of pending notices in registration order.
    pub fn pending_notices(&self) -> Vec<Notice> {
        let ledger = self.ledger.lock();
        ledger
            .notices
            .as_ref()
            .map(|notices| notices.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn invalidated_keys(&self) -> Vec<String> {
        self.ledger.lock().invalidated.iter().cloned().collect()
    }

    pub fn deferred_count(&self) -> usize {
        self.ledger.lock().deferred.len()
    }

    // -- Executor hooks ------------------------------------------------------

    pub(crate) fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub(crate) fn take_deferred(&self) -> Vec<Box<dyn DeferredCall<C>>> {
        std::mem::take(&mut self.ledger.lock().deferred)
    }

    pub(crate) fn take_invalidated(&self) -> Vec<String> {
        std::mem::take(&mut self.ledger.lock().invalidated)
            .into_iter()
            .collect()
    }

    pub(crate) fn take_tasks(&self) -> Vec<Task> {
        self.ledger
            .lock()
            .tasks
            .as_mut()
            .map(MergeRegistry::drain)
            .unwrap_or_default()
    }

    pub(crate) fn take_notices(&self) -> Vec<Notice> {
        self.ledger
            .lock()
            .notices
            .as_mut()
            .map(MergeRegistry::drain)
            .unwrap_or_default()
    }
}
