//! The [`Action`] trait and the types that describe an action's identity and
//! result.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use nova_common::{Error, Result};
use serde_json::Value;

use crate::context::ActionContext;
use crate::services::Connection;

/// Result of an action that ran to completion.
///
/// A [`Outcome::Failed`] is a soft failure: the action's work (and any side
/// effects it registered) is still committed and delivered, and the error is
/// then returned to the caller. Returning `Err` from [`Action::execute`] is a
/// hard failure that rolls the invocation back.
#[derive(Debug)]
pub enum Outcome<T> {
    Completed(T),
    Failed(Error),
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::Failed(error) => Err(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::Failed(error) => Outcome::Failed(error),
        }
    }
}

impl<T> From<T> for Outcome<T> {
    fn from(value: T) -> Self {
        Outcome::Completed(value)
    }
}

/// A unit of business logic run against an [`ActionContext`].
///
/// Sub-actions are invoked through [`ActionContext::run`] and
/// [`ActionContext::defer`], which share the caller's connection and side
/// effect registries.
#[async_trait]
pub trait Action<C: Connection>: Send + Sync + 'static {
    type Input: Send + 'static;

    /// Returned when the action is suppressed.
    type Output: Default + Send + 'static;

    /// Human-readable name used in logs, errors and rate-limit keys.
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &ActionContext<C>, input: Self::Input)
        -> Result<Outcome<Self::Output>>;
}

/// Converts raw inputs into an action's typed input.
#[async_trait]
pub trait Adapter<C: Connection, I>: Send + Sync {
    async fn adapt(
        &self,
        ctx: &ActionContext<C>,
        inputs: Value,
        auth: Option<&Value>,
        address: Option<&str>,
    ) -> Result<I>;
}

/// Identity of an action type, used for suppression and deferred-action
/// clearing.
///
/// Two keys are equal when they were created from the same Rust type.
#[derive(Clone, Copy)]
pub struct ActionKey {
    id: TypeId,
    type_name: &'static str,
}

impl ActionKey {
    pub fn of<A: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<A>(),
            type_name: type_name::<A>(),
        }
    }

    /// Key for the type of `action`.
    pub fn of_val<A: 'static>(_action: &A) -> Self {
        Self::of::<A>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ActionKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActionKey {}

impl Hash for ActionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionKey").field(&self.type_name).finish()
    }
}
