//! Transaction coordinator - picks the transaction kind for an invocation.

use std::error::Error as StdError;
use std::sync::Arc;

use parking_lot::RwLock;
use txscope_activity::Activity;
use txscope_core::{CoordinatorConfig, ScopeMode, TransactionOptions};
use txscope_transaction::{Transaction, TransactionError, TransactionHandle, TransactionResult};

use crate::error::CoordinatorResult;
use crate::retry::{RetryPolicies, RetryPolicy};

/// A freshly begun handle and whether its body must run forked.
///
/// A forked handle is not pushed on the caller's activity; the fork pushes it
/// on the activity it derives.
#[derive(Debug, Clone)]
pub struct CreatedTransaction {
    handle: Arc<TransactionHandle>,
    fork: bool,
}

impl CreatedTransaction {
    pub fn handle(&self) -> &Arc<TransactionHandle> {
        &self.handle
    }

    pub fn into_handle(self) -> Arc<TransactionHandle> {
        self.handle
    }

    pub fn should_fork(&self) -> bool {
        self.fork
    }
}

/// Transaction coordinator.
pub struct TransactionCoordinator {
    config: CoordinatorConfig,
    retry_policies: RwLock<RetryPolicies>,
}

impl TransactionCoordinator {
    /// Create a coordinator with default configuration.
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }

    pub fn with_config(config: CoordinatorConfig) -> Self {
        Self {
            config,
            retry_policies: RwLock::new(RetryPolicies::new()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // ========== Creation ==========

    /// Create the transaction an invocation with `options` needs on `activity`.
    ///
    /// - Suppress: `None`, activity untouched.
    /// - Empty activity, or Independent: a new independent transaction.
    /// - Otherwise: a dependent of the current transaction that blocks its
    ///   commit until it settles.
    ///
    /// The handle is begun before it is pushed, so a failed begin leaves the
    /// activity untouched. The returned handle is Active.
    pub fn create_transaction(
        &self,
        activity: &Activity,
        options: &TransactionOptions,
    ) -> TransactionResult<Option<CreatedTransaction>> {
        if options.scope() == ScopeMode::Suppress {
            tracing::trace!(activity = %activity.id(), "transaction suppressed");
            return Ok(None);
        }

        let depth = activity.count() + 1;
        if depth > self.config.max_depth {
            return Err(TransactionError::begin_failed(format!(
                "nesting depth {} exceeds the limit of {}",
                depth, self.config.max_depth
            )));
        }

        let transaction = match (options.scope(), activity.current_transaction()) {
            (ScopeMode::Required, Some(parent)) => {
                if parent.info().isolation != options.isolation() {
                    tracing::warn!(
                        parent = %parent.id(),
                        requested = %options.isolation(),
                        inherited = %parent.info().isolation,
                        "nested transaction inherits the parent's isolation level"
                    );
                }
                Transaction::dependent(parent.transaction())
            }
            _ => Transaction::independent(
                options.isolation(),
                options.timeout(),
                options.is_read_only(),
            ),
        };

        let fork = options.should_fork(depth);
        let handle = Arc::new(TransactionHandle::new(transaction, depth, options.clone()));
        handle.begin()?;

        if !fork {
            if let Err(e) = activity.push(handle.clone()) {
                handle.rollback()?;
                return Err(e);
            }
        }

        tracing::debug!(
            activity = %activity.id(),
            txn_id = %handle.id(),
            depth,
            dependent = handle.is_dependent(),
            fork,
            "transaction created"
        );
        Ok(Some(CreatedTransaction { handle, fork }))
    }

    // ========== Retry Policies ==========

    /// Register a named retry policy. Earlier registrations take precedence.
    pub fn add_retry_policy<P>(&self, key: impl Into<String>, policy: P) -> CoordinatorResult<()>
    where
        P: RetryPolicy + 'static,
    {
        self.retry_policies.write().add(key, Arc::new(policy))
    }

    /// Keys of the registered retry policies, in precedence order.
    pub fn retry_policy_keys(&self) -> Vec<String> {
        self.retry_policies.read().keys().map(str::to_string).collect()
    }

    /// Key of the policy that claims a failure of attempt number `attempt`.
    ///
    /// Fatal transaction errors and exhausted attempts are never claimed.
    pub fn claim_retry(&self, error: &(dyn StdError + 'static), attempt: u32) -> Option<String> {
        if attempt >= self.config.max_attempts {
            return None;
        }
        if TransactionError::find_in(error).is_some_and(TransactionError::is_fatal) {
            return None;
        }
        self.retry_policies
            .read()
            .claim(error, attempt)
            .map(str::to_string)
    }
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
