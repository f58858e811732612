//! Transactional store and the connection handle it hands out.

use async_trait::async_trait;
use nova_common::Result;

use crate::config::AcquireOptions;

/// How a connection should be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Commit the open transaction.
    Commit,
    /// Roll the open transaction back.
    Rollback,
    /// Release the connection; no transaction was started.
    Release,
}

/// Source of transactional connections.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Connection: Connection;

    /// Acquire a connection, starting a transaction if `options` ask for one.
    async fn acquire(&self, options: &AcquireOptions) -> Result<Self::Connection>;
}

/// A connection exclusively owned by one action invocation.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// `false` once the connection has been closed.
    fn is_active(&self) -> bool;

    /// Whether a transaction is open on this connection.
    fn in_transaction(&self) -> bool;

    /// Close the connection, finishing the transaction as directed.
    async fn close(&self, action: CloseAction) -> Result<()>;
}

impl CloseAction {
    /// Directive for a successful invocation.
    pub fn commit_for(connection: &impl Connection) -> Self {
        if connection.in_transaction() {
            CloseAction::Commit
        } else {
            CloseAction::Release
        }
    }

    /// Directive for a failed invocation.
    pub fn rollback_for(connection: &impl Connection) -> Self {
        if connection.in_transaction() {
            CloseAction::Rollback
        } else {
            CloseAction::Release
        }
    }
}
