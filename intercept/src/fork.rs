//! Results of invocations that may run forked.

use std::fmt;
use std::thread::JoinHandle;

use txscope_core::TransactionId;

use crate::error::InterceptError;

/// A detached fork running on its own worker thread.
///
/// Dropping the handle does not cancel the fork; its transaction still gates
/// the parent's commit.
pub struct ForkHandle<T, E> {
    method: String,
    transaction: TransactionId,
    worker: JoinHandle<Result<T, E>>,
}

impl<T, E> ForkHandle<T, E> {
    pub(crate) fn new(method: String, transaction: TransactionId, worker: JoinHandle<Result<T, E>>) -> Self {
        Self {
            method,
            transaction,
            worker,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The fork's dependent transaction.
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the fork and take its result.
    pub fn join(self) -> Result<T, E>
    where
        E: From<InterceptError>,
    {
        let Self {
            method,
            transaction,
            worker,
        } = self;
        worker
            .join()
            .unwrap_or_else(|_| Err(E::from(InterceptError::fork_panicked(method, transaction))))
    }
}

impl<T, E> fmt::Debug for ForkHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkHandle")
            .field("method", &self.method)
            .field("transaction", &self.transaction)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// What a spawning invocation produced.
#[must_use]
#[derive(Debug)]
pub enum Outcome<T, E> {
    /// The body ran to completion on the calling thread, or the caller
    /// waited for its fork.
    Completed(T),
    /// The body runs detached.
    Forked(ForkHandle<T, E>),
}

impl<T, E> Outcome<T, E> {
    pub fn is_forked(&self) -> bool {
        matches!(self, Outcome::Forked(_))
    }

    /// Value of a completed invocation.
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Forked(_) => None,
        }
    }

    /// Wait for the result, joining the fork if there is one.
    pub fn join(self) -> Result<T, E>
    where
        E: From<InterceptError>,
    {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::Forked(fork) => fork.join(),
        }
    }
}
