//! Side-effect descriptors accumulated by an action: queued [`Task`]s and
//! pub/sub [`Notice`]s.
//!
//! Both descriptors carry an optional merge policy. When a descriptor is
//! registered with an [`ActionContext`](crate::ActionContext), it is offered
//! every pending descriptor with the same dedup key (queue for tasks, target
//! for notices) and may absorb them into a single replacement.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

/// Merge policy: given the incoming descriptor and a pending one with the
/// same key, return the combined replacement or `None` to keep both.
pub type MergeFn<T> = Arc<dyn Fn(&T, &T) -> Option<T> + Send + Sync>;

/// A descriptor that can be de-duplicated against pending descriptors.
pub trait Mergeable: Clone {
    /// Key under which descriptors are considered for merging.
    fn dedup_key(&self) -> &str;

    /// Combine `self` (incoming) with `existing` (pending).
    fn merge(&self, existing: &Self) -> Option<Self>;
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Deferred out-of-process work routed to a named queue.
#[derive(Clone)]
pub struct Task {
    /// Target queue name.
    pub queue: String,
    /// Message body.
    pub payload: Value,
    /// Delay before the message becomes visible to consumers.
    pub delay: Option<Duration>,
    /// How long the message stays deliverable.
    pub ttl: Option<Duration>,
    merge: Option<MergeFn<Task>>,
}

impl Task {
    /// Create a task with no delay, no TTL and no merge policy.
    pub fn new(queue: impl Into<String>, payload: Value) -> Self {
        Self {
            queue: queue.into(),
            payload,
            delay: None,
            ttl: None,
            merge: None,
        }
    }

    /// Builder: set the delivery delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Builder: set the time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Builder: attach a merge policy.
    pub fn with_merge(
        mut self,
        merge: impl Fn(&Task, &Task) -> Option<Task> + Send + Sync + 'static,
    ) -> Self {
        self.merge = Some(Arc::new(merge));
        self
    }

    /// Copy of this task (merge policy included) carrying a different payload.
    pub fn with_payload(&self, payload: Value) -> Self {
        Self {
            payload,
            ..self.clone()
        }
    }
}

impl Mergeable for Task {
    fn dedup_key(&self) -> &str {
        &self.queue
    }

    fn merge(&self, existing: &Self) -> Option<Self> {
        self.merge.as_ref().and_then(|f| f(self, existing))
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.queue == other.queue
            && self.payload == other.payload
            && self.delay == other.delay
            && self.ttl == other.ttl
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("queue", &self.queue)
            .field("payload", &self.payload)
            .field("delay", &self.delay)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// A pub/sub event routed to a target channel.
#[derive(Clone)]
pub struct Notice {
    /// Target channel.
    pub target: String,
    /// Event name.
    pub event: String,
    /// Optional topic within the target.
    pub topic: Option<String>,
    /// Event body.
    pub payload: Value,
    merge: Option<MergeFn<Notice>>,
}

impl Notice {
    /// Create a notice with no topic and no merge policy.
    pub fn new(target: impl Into<String>, event: impl Into<String>, payload: Value) -> Self {
        Self {
            target: target.into(),
            event: event.into(),
            topic: None,
            payload,
            merge: None,
        }
    }

    /// Builder: set the topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Builder: attach a merge policy.
    pub fn with_merge(
        mut self,
        merge: impl Fn(&Notice, &Notice) -> Option<Notice> + Send + Sync + 'static,
    ) -> Self {
        self.merge = Some(Arc::new(merge));
        self
    }

    /// Copy of this notice (merge policy included) carrying a different payload.
    pub fn with_payload(&self, payload: Value) -> Self {
        Self {
            payload,
            ..self.clone()
        }
    }
}

impl Mergeable for Notice {
    fn dedup_key(&self) -> &str {
        &self.target
    }

    fn merge(&self, existing: &Self) -> Option<Self> {
        self.merge.as_ref().and_then(|f| f(self, existing))
    }
}

impl PartialEq for Notice {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.event == other.event
            && self.topic == other.topic
            && self.payload == other.payload
    }
}

impl fmt::Debug for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notice")
            .field("target", &self.target)
            .field("event", &self.event)
            .field("topic", &self.topic)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// NoticeFilter
// ---------------------------------------------------------------------------

/// Selects pending notices to drop.
///
/// A notice matches when every field set on the filter equals the notice's
/// corresponding field. A filter with no fields set matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeFilter {
    pub target: Option<String>,
    pub topic: Option<String>,
    pub event: Option<String>,
}

impl NoticeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        self.target.is_none() && self.topic.is_none() && self.event.is_none()
    }

    /// Whether `notice` is selected by this filter.
    pub fn matches(&self, notice: &Notice) -> bool {
        if self.is_empty() {
            return false;
        }
        self.target.as_ref().map_or(true, |t| *t == notice.target)
            && self.event.as_ref().map_or(true, |e| *e == notice.event)
            && self
                .topic
                .as_ref()
                .map_or(true, |t| notice.topic.as_ref() == Some(t))
    }
}

// ---------------------------------------------------------------------------
// SideEffect
// ---------------------------------------------------------------------------

/// Either kind of registrable descriptor.
#[derive(Debug, Clone)]
pub enum SideEffect {
    Task(Task),
    Notice(Notice),
}

impl From<Task> for SideEffect {
    fn from(task: Task) -> Self {
        SideEffect::Task(task)
    }
}

impl From<Notice> for SideEffect {
    fn from(notice: Notice) -> Self {
        SideEffect::Notice(notice)
    }
}
