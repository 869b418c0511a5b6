//! Named retry policies.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use txscope_transaction::TransactionError;

use crate::error::{CoordinatorError, CoordinatorResult};

/// Decides whether a failed transactional invocation should run again.
pub trait RetryPolicy: Send + Sync {
    /// `attempt` is 1 for the first failure.
    fn should_retry(&self, error: &(dyn StdError + 'static), attempt: u32) -> bool;
}

impl<F> RetryPolicy for F
where
    F: Fn(&(dyn StdError + 'static)) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &(dyn StdError + 'static), _attempt: u32) -> bool {
        self(error)
    }
}

/// Retries when the failure chain holds a retryable transaction error,
/// such as a timeout or a doomed transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransientFailures;

impl RetryPolicy for TransientFailures {
    fn should_retry(&self, error: &(dyn StdError + 'static), _attempt: u32) -> bool {
        TransactionError::find_in(error).is_some_and(TransactionError::is_retryable)
    }
}

/// Retry policies in registration order. The first to claim a failure wins.
#[derive(Default, Clone)]
pub struct RetryPolicies {
    policies: Vec<(String, Arc<dyn RetryPolicy>)>,
}

impl RetryPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, policy: Arc<dyn RetryPolicy>) -> CoordinatorResult<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(CoordinatorError::EmptyPolicyKey);
        }
        if self.policies.iter().any(|(existing, _)| *existing == key) {
            return Err(CoordinatorError::duplicate_policy(key));
        }
        self.policies.push((key, policy));
        Ok(())
    }

    /// Key of the first policy that asks for a retry.
    pub fn claim(&self, error: &(dyn StdError + 'static), attempt: u32) -> Option<&str> {
        self.policies
            .iter()
            .find(|(_, policy)| policy.should_retry(error, attempt))
            .map(|(key, _)| key.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.policies.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl fmt::Debug for RetryPolicies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}
