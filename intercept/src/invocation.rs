//! The context handed to a transactional body.

use std::fmt;
use std::sync::Arc;

use txscope_activity::Activity;
use txscope_transaction::{ResourceParticipant, TransactionError, TransactionHandle, TransactionResult};

use crate::error::InvocationError;
use crate::fork::Outcome;
use crate::interceptor::Interceptor;

/// One running invocation of a transactional method.
///
/// Nested calls made through [`Invocation::invoke`] carry this invocation's
/// activity explicitly, so they nest correctly on any thread.
pub struct Invocation<'a> {
    interceptor: &'a Interceptor,
    activity: &'a Activity,
    method: &'a str,
    handle: Option<&'a Arc<TransactionHandle>>,
    attempt: u32,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        interceptor: &'a Interceptor,
        activity: &'a Activity,
        method: &'a str,
        handle: Option<&'a Arc<TransactionHandle>>,
        attempt: u32,
    ) -> Self {
        Self {
            interceptor,
            activity,
            method,
            handle,
            attempt,
        }
    }

    /// The activity this body runs in.
    pub fn activity(&self) -> &Activity {
        self.activity
    }

    /// This invocation's handle; `None` when the transaction is suppressed.
    pub fn transaction(&self) -> Option<&Arc<TransactionHandle>> {
        self.handle
    }

    pub fn method(&self) -> &str {
        self.method
    }

    /// 1 for the first attempt, counting up on retries.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Enlist a participant into this invocation's transaction.
    pub fn enlist(&self, participant: Arc<dyn ResourceParticipant>) -> TransactionResult<bool> {
        match self.handle {
            Some(handle) => handle.enlist(participant),
            None => Err(TransactionError::not_active()),
        }
    }

    /// Invoke another declared method nested in this one.
    pub fn invoke<T, E, F>(&self, method: &str, body: F) -> Result<T, E>
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E> + Send,
        T: Send,
        E: InvocationError,
    {
        self.interceptor.invoke_in(self.activity, method, body)
    }

    /// Invoke another declared method nested in this one, allowing it to
    /// run as a detached fork.
    pub fn spawn<T, E, F>(&self, method: &str, body: F) -> Result<Outcome<T, E>, E>
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: InvocationError,
    {
        self.interceptor.spawn_in(self.activity, method, body)
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("method", &self.method)
            .field("activity", &self.activity.id())
            .field("transaction", &self.handle.map(|h| h.id()))
            .field("attempt", &self.attempt)
            .finish()
    }
}
