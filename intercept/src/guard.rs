//! Scope guard that always disposes a handle.

use std::sync::Arc;

use txscope_core::HandleState;
use txscope_transaction::TransactionHandle;

use crate::error::{lift, InterceptError};

/// Owns a begun handle for the duration of one invocation.
///
/// [`HandleGuard::finish`] completes or rolls back and disposes. If the guard
/// is dropped without finishing (a panicking body, a fork worker that never
/// started), the handle is disposed, which rolls it back.
pub(crate) struct HandleGuard {
    handle: Arc<TransactionHandle>,
}

impl HandleGuard {
    pub(crate) fn new(handle: Arc<TransactionHandle>) -> Self {
        Self { handle }
    }

    pub(crate) fn handle(&self) -> &Arc<TransactionHandle> {
        &self.handle
    }

    /// Complete on success, roll back on failure, then dispose.
    ///
    /// A body error is returned unchanged; rollback or dispose failures that
    /// follow it are logged.
    pub(crate) fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<InterceptError>,
    {
        let handle = &self.handle;
        let result = match outcome {
            Ok(value) => handle.complete().map(|()| value).map_err(lift),
            Err(error) => {
                if let Err(rollback) = handle.rollback() {
                    tracing::warn!(
                        txn_id = %handle.id(),
                        error = %rollback,
                        "rollback after a failed invocation reported errors"
                    );
                }
                Err(error)
            }
        };

        match (result, handle.dispose()) {
            (result, Ok(())) => result,
            (Ok(_), Err(disposed)) => Err(lift(disposed)),
            (Err(error), Err(disposed)) => {
                tracing::warn!(txn_id = %handle.id(), error = %disposed, "dispose failed");
                Err(error)
            }
        }
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if self.handle.state() == HandleState::Disposed {
            return;
        }
        tracing::warn!(
            txn_id = %self.handle.id(),
            state = %self.handle.state(),
            "invocation abandoned its transaction; disposing"
        );
        if let Err(e) = self.handle.dispose() {
            tracing::warn!(txn_id = %self.handle.id(), error = %e, "dispose failed");
        }
    }
}
