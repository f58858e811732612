//! Executor: runs one action per request inside a transactional envelope.
//!
//! An invocation goes through these phases:
//!
//! 1. authorization material is decoded and rate limits are enforced,
//! 2. a store connection is acquired and an [`ActionContext`] is built,
//! 3. the caller is authenticated and inputs are adapted,
//! 4. the action runs; a hard failure rolls the connection back,
//! 5. the connection is committed and the context sealed,
//! 6. deferred sub-actions run, invalidated cache keys are cleared, and
//!    tasks and notices are delivered.
//!
//! Errors raised before delivery finishes are wrapped in
//! [`Error::ActionFailed`]. A soft failure ([`Outcome::Failed`]) is returned
//! unwrapped after its side effects have been delivered.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use nova_common::{validate, Error, OperationId, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::Instrument;

use crate::action::{Action, Adapter, Outcome};
use crate::config::ExecutorOptions;
use crate::context::ActionContext;
use crate::services::{
    Authenticator, Cache, CloseAction, Connection, Dispatcher, Logger, NoopLogger, Notifier,
    RateLimiter, Requestor, Store, UnavailableCache,
};

type ConnectionOf<S> = <S as Store>::Connection;

/// Runs a single [`Action`] per request.
pub struct Executor<S: Store, A: Action<S::Connection>> {
    store: Arc<S>,
    action: Arc<A>,
    adapter: Option<Arc<dyn Adapter<S::Connection, A::Input>>>,
    authenticator: Option<Arc<dyn Authenticator<S::Connection>>>,
    cache: Option<Arc<dyn Cache>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    notifier: Option<Arc<dyn Notifier>>,
    limiter: Option<Arc<dyn RateLimiter>>,
    logger: Arc<dyn Logger>,
    options: ExecutorOptions,
}

/// Builder for [`Executor`].
pub struct ExecutorBuilder<S: Store, A: Action<S::Connection>> {
    store: Arc<S>,
    action: Arc<A>,
    adapter: Option<Arc<dyn Adapter<S::Connection, A::Input>>>,
    authenticator: Option<Arc<dyn Authenticator<S::Connection>>>,
    cache: Option<Arc<dyn Cache>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    notifier: Option<Arc<dyn Notifier>>,
    limiter: Option<Arc<dyn RateLimiter>>,
    logger: Option<Arc<dyn Logger>>,
    options: ExecutorOptions,
}

impl<S: Store, A: Action<S::Connection>> ExecutorBuilder<S, A> {
    pub fn adapter(mut self, adapter: Arc<dyn Adapter<S::Connection, A::Input>>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator<S::Connection>>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Defaults to [`NoopLogger`].
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the configuration and build the executor.
    pub fn build(self) -> Result<Executor<S, A>> {
        self.options.validate()?;
        validate::configured(
            self.options.rate_limits.is_empty() || self.limiter.is_some(),
            "Cannot create an executor: rate limits require a rate limiter",
        )?;
        validate::configured(
            self.options.auth.is_none() || self.authenticator.is_some(),
            "Cannot create an executor: auth options require an authenticator",
        )?;

        Ok(Executor {
            store: self.store,
            action: self.action,
            adapter: self.adapter,
            authenticator: self.authenticator,
            cache: self.cache,
            dispatcher: self.dispatcher,
            notifier: self.notifier,
            limiter: self.limiter,
            logger: self.logger.unwrap_or_else(|| Arc::new(NoopLogger)),
            options: self.options,
        })
    }
}

impl<S: Store, A: Action<S::Connection>> Executor<S, A> {
    pub fn builder(store: Arc<S>, action: Arc<A>) -> ExecutorBuilder<S, A> {
        ExecutorBuilder {
            store,
            action,
            adapter: None,
            authenticator: None,
            cache: None,
            dispatcher: None,
            notifier: None,
            limiter: None,
            logger: None,
            options: ExecutorOptions::default(),
        }
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Execute the action for one request.
    ///
    /// `timestamp` defaults to now and is exposed to the action through
    /// [`ActionContext::timestamp`].
    pub async fn execute(
        &self,
        inputs: Value,
        requestor: &Requestor,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<A::Output>
    where
        A::Input: DeserializeOwned,
    {
        let operation = OperationId::new();
        let span = tracing::info_span!("action", name = self.action.name(), %operation);
        self.execute_operation(operation, inputs, requestor, timestamp)
            .instrument(span)
            .await
    }

    async fn execute_operation(
        &self,
        operation: OperationId,
        inputs: Value,
        requestor: &Requestor,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<A::Output>
    where
        A::Input: DeserializeOwned,
    {
        let started = Instant::now();
        let name = self.action.name();
        self.logger.debug(&format!("Executing {name} action"));

        let credentials = match self.decode_credentials(requestor) {
            Ok(credentials) => credentials,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = self.enforce_rate_limits(requestor, credentials.as_ref()).await {
            return Err(self.fail(e));
        }

        let connection = match self.store.acquire(&self.options.acquire).await {
            Ok(connection) => connection,
            Err(e) => return Err(self.fail(e)),
        };
        let ctx = self.create_context(operation, connection, timestamp);

        let outcome = match self.invoke(&ctx, inputs, requestor, credentials).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.abort(&ctx, e).await),
        };

        let close = CloseAction::commit_for(ctx.connection());
        if let Err(e) = ctx.connection().close(close).await {
            return Err(self.abort(&ctx, e).await);
        }
        ctx.seal();

        let deferred = self.run_deferred(&ctx).await;

        if let Err(e) = self.invalidate(&ctx).await {
            return Err(self.fail(e));
        }
        if let Err(e) = self.deliver(&ctx).await {
            return Err(self.fail(e));
        }

        let time = started.elapsed().as_millis() as u64;
        self.logger
            .log(&format!("Executed {name} action"), &json!({ "time": time }));

        match (deferred, outcome.into_result()) {
            (Err(e), Err(soft)) => {
                self.logger.error(&soft);
                Err(e)
            }
            (Err(e), Ok(_)) => Err(e),
            (Ok(()), result) => result,
        }
    }

    fn authenticator(&self) -> Result<&Arc<dyn Authenticator<S::Connection>>> {
        self.authenticator
            .as_ref()
            .ok_or_else(|| Error::config("Cannot authenticate: authenticator is undefined"))
    }

    fn decode_credentials(&self, requestor: &Requestor) -> Result<Option<Value>> {
        match &requestor.auth {
            Some(auth) => Ok(Some(self.authenticator()?.decode(auth)?)),
            None => Ok(None),
        }
    }

    /// Attempt the local and global limits concurrently.
    ///
    /// The caller is keyed by credential owner, else by address. A caller
    /// with neither is not limited.
    async fn enforce_rate_limits(
        &self,
        requestor: &Requestor,
        credentials: Option<&Value>,
    ) -> Result<()> {
        let limits = &self.options.rate_limits;
        if limits.is_empty() {
            return Ok(());
        }
        let limiter = self
            .limiter
            .as_ref()
            .ok_or_else(|| Error::config("Cannot enforce rate limits: rate limiter is undefined"))?;

        let owner = match credentials {
            Some(credentials) => Some(self.authenticator()?.to_owner(credentials)?),
            None => requestor.address.clone(),
        };
        let Some(owner) = owner else {
            return Ok(());
        };

        let local_key = format!("{owner}::{}", self.action.name());
        let local = async {
            match &limits.local {
                Some(options) => limiter.attempt(&local_key, options).await,
                None => Ok(()),
            }
        };
        let global = async {
            match &limits.global {
                Some(options) => limiter.attempt(&owner, options).await,
                None => Ok(()),
            }
        };
        tokio::try_join!(local, global)?;
        Ok(())
    }

    fn create_context(
        &self,
        operation: OperationId,
        connection: ConnectionOf<S>,
        timestamp: Option<DateTime<Utc>>,
    ) -> ActionContext<ConnectionOf<S>> {
        let cache = self
            .cache
            .clone()
            .unwrap_or_else(|| Arc::new(UnavailableCache));

        ActionContext::new(connection)
            .with_operation(operation)
            .with_action(self.action.name())
            .with_cache(cache)
            .with_logger(self.logger.clone())
            .with_timestamp(timestamp.unwrap_or_else(Utc::now))
            .with_tasks(self.dispatcher.is_some())
            .with_notices(self.notifier.is_some())
    }

    async fn invoke(
        &self,
        ctx: &ActionContext<ConnectionOf<S>>,
        inputs: Value,
        requestor: &Requestor,
        credentials: Option<Value>,
    ) -> Result<Outcome<A::Output>>
    where
        A::Input: DeserializeOwned,
    {
        let auth = match credentials {
            Some(credentials) => Some(
                self.authenticator()?
                    .authenticate(ctx, credentials, self.options.auth.as_ref())
                    .await?,
            ),
            None => None,
        };

        let inputs = merge_defaults(&self.options.defaults, inputs);
        let input = match &self.adapter {
            Some(adapter) => {
                adapter
                    .adapt(ctx, inputs, auth.as_ref(), requestor.address.as_deref())
                    .await?
            }
            None => serde_json::from_value(inputs)?,
        };

        self.action.execute(ctx, input).await
    }

    /// Run every deferred sub-action concurrently and wait for all of them.
    /// Every failure is logged; the first one is returned.
    async fn run_deferred(&self, ctx: &ActionContext<ConnectionOf<S>>) -> Result<()> {
        let deferred = ctx.take_deferred();
        if deferred.is_empty() {
            return Ok(());
        }
        let results = join_all(deferred.into_iter().map(|call| call.call(ctx))).await;
        let mut first = None;
        for e in results.into_iter().filter_map(Result::err) {
            self.logger.error(&e);
            first.get_or_insert(e);
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn invalidate(&self, ctx: &ActionContext<ConnectionOf<S>>) -> Result<()> {
        let keys = ctx.take_invalidated();
        if keys.is_empty() {
            return Ok(());
        }
        ctx.cache().clear(&keys).await
    }

    /// Dispatch tasks and send notices concurrently, waiting for both.
    async fn deliver(&self, ctx: &ActionContext<ConnectionOf<S>>) -> Result<()> {
        let tasks = ctx.take_tasks();
        let notices = ctx.take_notices();

        let dispatch = async {
            match &self.dispatcher {
                Some(dispatcher) if !tasks.is_empty() => {
                    try_join_all(tasks.iter().map(|task| dispatcher.send(task)))
                        .await
                        .map(drop)
                }
                _ => Ok(()),
            }
        };
        let notify = async {
            match &self.notifier {
                Some(notifier) if !notices.is_empty() => notifier.send(&notices).await,
                _ => Ok(()),
            }
        };

        let (dispatched, notified) = tokio::join!(dispatch, notify);
        dispatched.and(notified)
    }

    /// Roll back (or release) a still-active connection, then wrap `error`.
    async fn abort(&self, ctx: &ActionContext<ConnectionOf<S>>, error: Error) -> Error {
        let connection = ctx.connection();
        if connection.is_active() {
            let close = CloseAction::rollback_for(connection);
            if let Err(e) = connection.close(close).await {
                self.logger
                    .warn(&format!("Failed to close connection after error: {e}"));
            }
        }
        self.fail(error)
    }

    fn fail(&self, error: Error) -> Error {
        let error = Error::action_failed(self.action.name(), error);
        self.logger.error(&error);
        error
    }
}

impl<S: Store, A: Action<S::Connection>> fmt::Debug for Executor<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("action", &self.action.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Shallow-merge `defaults` under `inputs`; caller values win.
///
/// Non-object inputs are returned untouched, except `null`, which is
/// replaced by the defaults.
fn merge_defaults(defaults: &Map<String, Value>, inputs: Value) -> Value {
    if defaults.is_empty() {
        return inputs;
    }
    match inputs {
        Value::Object(mut fields) => {
            for (key, value) in defaults {
                fields.entry(key.clone()).or_insert_with(|| value.clone());
            }
            Value::Object(fields)
        }
        Value::Null => Value::Object(defaults.clone()),
        other => other,
    }
}
