//! Coordinator configuration.

use serde::{Deserialize, Serialize};

use crate::TransactionOptions;

/// Configuration for the transaction coordinator and interceptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Options applied to undeclared methods when declarations are not strict.
    pub default_options: TransactionOptions,
    /// Reject invocations of methods missing from the declaration table.
    pub strict_declarations: bool,
    /// Upper bound on attempts when a retry policy asks for a retry.
    pub max_attempts: u32,
    /// Maximum nesting depth of one activity.
    pub max_depth: usize,
    /// Name prefix for forked worker threads.
    pub fork_thread_prefix: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_options: TransactionOptions::default(),
            strict_declarations: true,
            max_attempts: 3,
            max_depth: 64,
            fork_thread_prefix: "txscope-fork".to_string(),
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_options(mut self, options: TransactionOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn with_strict_declarations(mut self, strict: bool) -> Self {
        self.strict_declarations = strict;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_fork_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fork_thread_prefix = prefix.into();
        self
    }

    /// Lenient preset: undeclared methods run with default options and
    /// failures are never retried.
    pub fn lenient() -> Self {
        Self {
            strict_declarations: false,
            max_attempts: 1,
            ..Self::default()
        }
    }
}
