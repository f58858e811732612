//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], a set of in-memory collaborators that record
//! every call into a shared [`Journal`], plus a couple of sample actions.
//! Tests assert on the order of journal entries to check sequencing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nova::{
    AcquireOptions, Action, ActionContext, AuthInputs, Authenticator, Cache, CloseAction,
    Connection, Dispatcher, Error, ExecutorBuilder, Executor, Logger, Notice, Notifier, Outcome,
    QueueMessage, RateLimiter, RateOptions, Result, Store, Task,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Ordered record of collaborator calls, shared by every mock.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Index of the first entry starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.0.lock().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.position(prefix).is_some()
    }

    /// Panic unless every prefix is present and they appear in order.
    pub fn assert_order(&self, prefixes: &[&str]) {
        let positions: Vec<usize> = prefixes
            .iter()
            .map(|p| {
                self.position(p)
                    .unwrap_or_else(|| panic!("missing {p:?} in {:#?}", self.entries()))
            })
            .collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "expected order {prefixes:?}, got {:#?}",
            self.entries()
        );
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct MockConnection {
    journal: Journal,
    transaction: bool,
    active: AtomicBool,
}

#[async_trait]
impl Connection for MockConnection {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn in_transaction(&self) -> bool {
        self.transaction
    }

    async fn close(&self, action: CloseAction) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        self.journal.record(format!("close:{action:?}"));
        Ok(())
    }
}

impl MockConnection {
    pub fn new(journal: Journal, transaction: bool) -> Self {
        Self {
            journal,
            transaction,
            active: AtomicBool::new(true),
        }
    }
}

pub struct MockStore {
    journal: Journal,
    pub fail: AtomicBool,
}

#[async_trait]
impl Store for MockStore {
    type Connection = MockConnection;

    async fn acquire(&self, options: &AcquireOptions) -> Result<MockConnection> {
        self.journal.record("acquire");
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::store("connection refused"));
        }
        Ok(MockConnection::new(
            self.journal.clone(),
            options.start_transaction,
        ))
    }
}

// ---------------------------------------------------------------------------
// Cache, dispatcher, notifier
// ---------------------------------------------------------------------------

pub struct MockCache {
    journal: Journal,
    values: Mutex<HashMap<String, Value>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Cache for MockCache {
    async fn get(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        let values = self.values.lock();
        Ok(keys.iter().map(|k| values.get(k).cloned()).collect())
    }

    async fn set(&self, key: &str, value: Value, _ttl: Option<Duration>) -> Result<()> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn execute(&self, _script: &str, _keys: &[String], _params: &[Value]) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn clear(&self, keys: &[String]) -> Result<()> {
        self.journal.record(format!("cache.clear:{}", keys.join(",")));
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::cache("cache is down"));
        }
        let mut values = self.values.lock();
        for key in keys {
            values.remove(key);
        }
        Ok(())
    }
}

pub struct MockDispatcher {
    journal: Journal,
    pub sent: Mutex<Vec<Task>>,
}

#[async_trait]
impl Dispatcher for MockDispatcher {
    async fn send(&self, task: &Task) -> Result<()> {
        self.journal
            .record(format!("dispatch:{}:{}", task.queue, task.payload));
        self.sent.lock().push(task.clone());
        Ok(())
    }

    async fn receive(&self, _queue: &str) -> Result<Option<QueueMessage>> {
        Ok(None)
    }

    async fn delete(&self, _message: &QueueMessage) -> Result<()> {
        Ok(())
    }
}

pub struct MockNotifier {
    journal: Journal,
    pub sent: Mutex<Vec<Notice>>,
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, notices: &[Notice]) -> Result<()> {
        for notice in notices {
            self.journal
                .record(format!("notify:{}:{}", notice.target, notice.event));
        }
        self.sent.lock().extend_from_slice(notices);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rate limiter, authenticator, logger
// ---------------------------------------------------------------------------

pub struct MockLimiter {
    journal: Journal,
    attempts: Mutex<HashMap<String, u32>>,
}

#[async_trait]
impl RateLimiter for MockLimiter {
    async fn attempt(&self, key: &str, options: &RateOptions) -> Result<()> {
        self.journal.record(format!("limit:{key}"));
        let mut attempts = self.attempts.lock();
        let count = attempts.entry(key.to_string()).or_insert(0);
        *count += 1;
        if *count > options.limit {
            return Err(Error::TooManyRequests(format!("rate limit exceeded for {key}")));
        }
        Ok(())
    }
}

/// Accepts `bearer user:<name>` credentials; `mallory` never authenticates.
pub struct MockAuthenticator {
    journal: Journal,
}

#[async_trait]
impl Authenticator<MockConnection> for MockAuthenticator {
    fn decode(&self, inputs: &AuthInputs) -> Result<Value> {
        if inputs.scheme != "bearer" {
            return Err(Error::Unauthorized(format!(
                "unsupported scheme {}",
                inputs.scheme
            )));
        }
        let user = inputs
            .credentials
            .strip_prefix("user:")
            .ok_or_else(|| Error::Unauthorized("malformed credentials".into()))?;
        Ok(json!({ "user": user }))
    }

    fn to_owner(&self, credentials: &Value) -> Result<String> {
        credentials["user"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Unauthorized("no owner".into()))
    }

    async fn authenticate(
        &self,
        _ctx: &ActionContext<MockConnection>,
        credentials: Value,
        options: Option<&Value>,
    ) -> Result<Value> {
        self.journal.record("authenticate");
        if credentials["user"] == "mallory" {
            return Err(Error::Unauthorized("mallory is not welcome".into()));
        }
        Ok(json!({ "user": credentials["user"], "options": options }))
    }
}

pub struct MockLogger {
    journal: Journal,
}

impl Logger for MockLogger {
    fn debug(&self, message: &str) {
        self.journal.record(format!("debug:{message}"));
    }

    fn info(&self, message: &str) {
        self.journal.record(format!("info:{message}"));
    }

    fn warn(&self, message: &str) {
        self.journal.record(format!("warn:{message}"));
    }

    fn error(&self, error: &Error) {
        self.journal.record(format!("error:{error}"));
    }

    fn log(&self, event: &str, properties: &Value) {
        self.journal.record(format!("log:{event}:{properties}"));
    }

    fn track(&self, metric: &str, value: f64) {
        self.journal.record(format!("track:{metric}:{value}"));
    }

    fn trace(&self, service: &str, command: &str, _elapsed: Duration, success: bool) {
        self.journal
            .record(format!("trace:{service}:{command}:{success}"));
    }
}

// ---------------------------------------------------------------------------
// Sample actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    Hard,
    Soft,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    pub name: String,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub fail: Option<Failure>,
    #[serde(default)]
    pub audit: bool,
}

/// Registers an email task, a `users/created` notice and a cache key, and
/// optionally defers an [`Audit`].
pub struct CreateUser {
    pub journal: Journal,
    pub audit: Arc<Audit>,
}

#[async_trait]
impl Action<MockConnection> for CreateUser {
    type Input = CreateUserInput;
    type Output = Value;

    fn name(&self) -> &'static str {
        "create_user"
    }

    async fn execute(
        &self,
        ctx: &ActionContext<MockConnection>,
        input: CreateUserInput,
    ) -> Result<Outcome<Value>> {
        self.journal.record(format!("action:create_user:{}", input.name));

        ctx.register(Task::new("emails", json!({ "to": input.name })))?;
        ctx.register(Notice::new("users", "created", json!({ "name": input.name })))?;
        ctx.invalidate(format!("users:{}", input.name));
        if input.audit {
            ctx.defer(self.audit.clone(), format!("created {}", input.name))?;
        }

        match input.fail {
            Some(Failure::Hard) => Err(Error::NotFound("team".into())),
            Some(Failure::Soft) => Ok(Outcome::Failed(Error::InvalidInputs(
                "name is taken".into(),
            ))),
            None => Ok(Outcome::Completed(json!({
                "name": input.name,
                "page": input.page,
                "at": ctx.timestamp().to_rfc3339(),
            }))),
        }
    }
}

/// Records its input; optionally sleeps first and/or fails.
pub struct Audit {
    pub journal: Journal,
    pub fail: bool,
    pub delay: Option<Duration>,
}

#[async_trait]
impl Action<MockConnection> for Audit {
    type Input = String;
    type Output = ();

    fn name(&self) -> &'static str {
        "audit"
    }

    async fn execute(&self, _ctx: &ActionContext<MockConnection>, input: String) -> Result<Outcome<()>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.journal.record(format!("deferred:audit:{input}"));
        if self.fail {
            return Err(Error::internal("audit log unavailable"));
        }
        Ok(Outcome::Completed(()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Collaborators sharing one journal.
pub struct TestHarness {
    pub journal: Journal,
    pub store: Arc<MockStore>,
    pub cache: Arc<MockCache>,
    pub dispatcher: Arc<MockDispatcher>,
    pub notifier: Arc<MockNotifier>,
    pub limiter: Arc<MockLimiter>,
    pub authenticator: Arc<MockAuthenticator>,
    pub logger: Arc<MockLogger>,
}

impl TestHarness {
    pub fn new() -> Self {
        init_tracing();
        let journal = Journal::default();
        Self {
            store: Arc::new(MockStore {
                journal: journal.clone(),
                fail: AtomicBool::new(false),
            }),
            cache: Arc::new(MockCache {
                journal: journal.clone(),
                values: Mutex::new(HashMap::new()),
                fail: AtomicBool::new(false),
            }),
            dispatcher: Arc::new(MockDispatcher {
                journal: journal.clone(),
                sent: Mutex::new(Vec::new()),
            }),
            notifier: Arc::new(MockNotifier {
                journal: journal.clone(),
                sent: Mutex::new(Vec::new()),
            }),
            limiter: Arc::new(MockLimiter {
                journal: journal.clone(),
                attempts: Mutex::new(HashMap::new()),
            }),
            authenticator: Arc::new(MockAuthenticator {
                journal: journal.clone(),
            }),
            logger: Arc::new(MockLogger {
                journal: journal.clone(),
            }),
            journal,
        }
    }

    pub fn audit(&self, fail: bool, delay: Option<Duration>) -> Arc<Audit> {
        Arc::new(Audit {
            journal: self.journal.clone(),
            fail,
            delay,
        })
    }

    pub fn create_user(&self) -> Arc<CreateUser> {
        Arc::new(CreateUser {
            journal: self.journal.clone(),
            audit: self.audit(false, None),
        })
    }

    /// Builder with every collaborator wired in.
    pub fn executor<A: Action<MockConnection>>(
        &self,
        action: Arc<A>,
    ) -> ExecutorBuilder<MockStore, A> {
        self.bare(action)
            .cache(self.cache.clone())
            .dispatcher(self.dispatcher.clone())
            .notifier(self.notifier.clone())
            .rate_limiter(self.limiter.clone())
            .authenticator(self.authenticator.clone())
    }

    /// Builder with only the store and the logger.
    pub fn bare<A: Action<MockConnection>>(&self, action: Arc<A>) -> ExecutorBuilder<MockStore, A> {
        Executor::builder(self.store.clone(), action).logger(self.logger.clone())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
