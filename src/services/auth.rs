//! Caller identity and the authenticator collaborator.

use async_trait::async_trait;
use nova_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ActionContext;
use crate::services::store::Connection;

/// Raw authorization material as presented by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInputs {
    /// Authorization scheme, e.g. `"bearer"`.
    pub scheme: String,
    /// Scheme-specific credentials string.
    pub credentials: String,
}

impl AuthInputs {
    pub fn new(scheme: impl Into<String>, credentials: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            credentials: credentials.into(),
        }
    }
}

/// Who is invoking an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requestor {
    /// Network address of the caller.
    #[serde(default)]
    pub address: Option<String>,
    /// Authorization material, if the caller presented any.
    #[serde(default)]
    pub auth: Option<AuthInputs>,
}

impl Requestor {
    /// An anonymous caller with no address.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Builder: set the caller address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Builder: attach authorization material.
    pub fn with_auth(mut self, scheme: impl Into<String>, credentials: impl Into<String>) -> Self {
        self.auth = Some(AuthInputs::new(scheme, credentials));
        self
    }
}

/// Turns caller credentials into authentication info.
#[async_trait]
pub trait Authenticator<C: Connection>: Send + Sync {
    /// Decode raw authorization material into structured credentials.
    fn decode(&self, inputs: &AuthInputs) -> Result<Value>;

    /// Stable owner identity for `credentials`, used as the rate-limit key.
    fn to_owner(&self, credentials: &Value) -> Result<String>;

    /// Verify `credentials`, possibly against the store, and return the
    /// authentication info handed to the adapter.
    async fn authenticate(
        &self,
        ctx: &ActionContext<C>,
        credentials: Value,
        options: Option<&Value>,
    ) -> Result<Value>;
}
