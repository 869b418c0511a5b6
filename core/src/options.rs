//! Declared transaction options.
//!
//! Options are built once per declared method and shared immutably by every
//! invocation of that method.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Isolation level requested for a physical transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Snapshot,
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsolationLevel::ReadUncommitted => "read uncommitted",
            IsolationLevel::ReadCommitted => "read committed",
            IsolationLevel::RepeatableRead => "repeatable read",
            IsolationLevel::Snapshot => "snapshot",
            IsolationLevel::Serializable => "serializable",
        };
        f.write_str(name)
    }
}

/// How a method relates to the ambient transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// Join the ambient transaction as a dependent, or start one if none exists.
    #[default]
    Required,
    /// Always start a new independent transaction.
    Independent,
    /// Run without any ambient transaction.
    Suppress,
}

/// Options attached to a transactional method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    isolation: IsolationLevel,
    scope: ScopeMode,
    read_only: bool,
    fork: bool,
    wait_all: bool,
    async_commit: bool,
    timeout: Option<Duration>,
}

impl TransactionOptions {
    /// Options with all defaults: read committed, Required, no timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a method that suppresses the ambient transaction.
    pub fn suppressed() -> Self {
        Self::default().with_scope(ScopeMode::Suppress)
    }

    /// Shorthand for a method that always runs in its own transaction.
    pub fn independent() -> Self {
        Self::default().with_scope(ScopeMode::Independent)
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn with_scope(mut self, scope: ScopeMode) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_fork(mut self, fork: bool) -> Self {
        self.fork = fork;
        self
    }

    pub fn with_wait_all(mut self, wait_all: bool) -> Self {
        self.wait_all = wait_all;
        self
    }

    pub fn with_async_commit(mut self, async_commit: bool) -> Self {
        self.async_commit = async_commit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn scope(&self) -> ScopeMode {
        self.scope
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_fork(&self) -> bool {
        self.fork
    }

    pub fn is_wait_all(&self) -> bool {
        self.wait_all
    }

    pub fn is_async_commit(&self) -> bool {
        self.async_commit
    }

    /// Timeout of the physical transaction, `None` meaning unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether an invocation that would sit at `next_depth` runs forked.
    ///
    /// Forking needs a parent transaction to depend on, so a fork requested
    /// at the top of an empty activity runs inline.
    pub fn should_fork(&self, next_depth: usize) -> bool {
        self.fork && next_depth > 1
    }
}
