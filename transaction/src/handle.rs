//! Transaction handle: the state machine around one physical transaction.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use txscope_core::{messages, HandleState, TransactionId, TransactionOptions};

use crate::error::{TransactionError, TransactionResult};
use crate::participant::ResourceParticipant;
use crate::transaction::{Transaction, TransactionInfo};

type ReleaseFn = Box<dyn FnOnce() -> TransactionResult<()> + Send>;

/// A transaction handle owned by one invocation.
///
/// Handles are shared (`Arc`) between the invocation driving them and the
/// activity stack that exposes them as current. Every accessor is a pure read.
pub struct TransactionHandle {
    transaction: Transaction,
    depth: usize,
    options: TransactionOptions,
    state: Mutex<HandleState>,
    release: Mutex<Option<ReleaseFn>>,
    failed_policy: Mutex<Option<String>>,
}

impl TransactionHandle {
    /// Wrap a physical transaction. The handle starts Constructed.
    pub fn new(transaction: Transaction, depth: usize, options: TransactionOptions) -> Self {
        Self {
            transaction,
            depth,
            options,
            state: Mutex::new(HandleState::Constructed),
            release: Mutex::new(None),
            failed_policy: Mutex::new(None),
        }
    }

    // ========== Accessors ==========

    pub fn id(&self) -> TransactionId {
        self.transaction.id()
    }

    pub fn state(&self) -> HandleState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == HandleState::Active
    }

    /// Nesting depth: 1 for the first handle of an activity.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn options(&self) -> &TransactionOptions {
        &self.options
    }

    pub fn info(&self) -> &TransactionInfo {
        self.transaction.info()
    }

    /// The underlying physical transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn is_dependent(&self) -> bool {
        self.transaction.is_dependent()
    }

    /// Key of the retry policy that claimed this handle's failure, if any.
    pub fn failed_policy(&self) -> Option<String> {
        self.failed_policy.lock().clone()
    }

    // ========== Wiring ==========

    /// Install the callback that pops this handle from its activity.
    ///
    /// Called exactly once, when the handle is pushed.
    pub fn on_release<F>(&self, release: F) -> TransactionResult<()>
    where
        F: FnOnce() -> TransactionResult<()> + Send + 'static,
    {
        let mut slot = self.release.lock();
        if slot.is_some() {
            return Err(TransactionError::precondition(format!(
                "transaction {} is already attached to an activity",
                self.id()
            )));
        }
        *slot = Some(Box::new(release));
        Ok(())
    }

    /// Record which retry policy claimed this handle's failure.
    pub fn record_failed_policy(&self, key: impl Into<String>) {
        *self.failed_policy.lock() = Some(key.into());
    }

    // ========== Lifecycle ==========

    /// Constructed -> Active. On failure the state stays Constructed.
    pub fn begin(&self) -> TransactionResult<()> {
        let mut state = self.state.lock();
        match *state {
            HandleState::Constructed => {}
            HandleState::Disposed => return Err(TransactionError::disposed()),
            _ => return Err(TransactionError::precondition(messages::ERR_ALREADY_BEGUN)),
        }

        self.transaction.start()?;
        *state = HandleState::Active;
        tracing::debug!(txn_id = %self.id(), depth = self.depth, "handle active");
        Ok(())
    }

    /// Enlist a participant into this handle's transaction.
    pub fn enlist(&self, participant: Arc<dyn ResourceParticipant>) -> TransactionResult<bool> {
        self.ensure_active()?;
        self.transaction.enlist(participant)
    }

    /// Active -> Committed, or InDoubt.
    ///
    /// Any other commit failure rolls the transaction back before returning
    /// [`TransactionError::CommitFailed`], so the handle is never left Active.
    pub fn complete(&self) -> TransactionResult<()> {
        self.ensure_active()?;

        // The state lock is not held across commit, which may block on dependents.
        match self.transaction.commit() {
            Ok(()) => {
                self.set_state(HandleState::Committed);
                Ok(())
            }
            Err(err @ TransactionError::InDoubt { .. }) => {
                self.set_state(HandleState::InDoubt);
                Err(err)
            }
            Err(cause) => {
                tracing::debug!(txn_id = %self.id(), error = %cause, "commit failed; rolling back");
                let rollback = match self.transaction.rollback() {
                    Ok(()) => None,
                    Err(TransactionError::RollbackFailed(failure)) => Some(failure),
                    Err(other) => {
                        self.set_state(HandleState::Aborted);
                        return Err(TransactionError::fatal(format!(
                            "transaction {} could not roll back after a failed commit ({}): {}",
                            self.id(),
                            cause,
                            other
                        )));
                    }
                };
                self.set_state(HandleState::Aborted);
                Err(TransactionError::CommitFailed {
                    txn: self.id(),
                    cause: Box::new(cause),
                    rollback,
                })
            }
        }
    }

    /// Active -> Aborted. A repeat call once Aborted is a no-op.
    pub fn rollback(&self) -> TransactionResult<()> {
        {
            let state = self.state.lock();
            match *state {
                HandleState::Active => {}
                HandleState::Aborted => return Ok(()),
                HandleState::Disposed => return Err(TransactionError::disposed()),
                _ => return Err(TransactionError::not_active()),
            }
        }

        let result = self.transaction.rollback();
        self.set_state(HandleState::Aborted);
        result
    }

    /// Any state -> Disposed, rolling back first if still Active.
    ///
    /// The release callback runs exactly once; a repeat call is a no-op.
    pub fn dispose(&self) -> TransactionResult<()> {
        let rolled_back = match self.state() {
            HandleState::Disposed => return Ok(()),
            HandleState::Active => self.rollback(),
            _ => Ok(()),
        };

        {
            let mut state = self.state.lock();
            if *state == HandleState::Disposed {
                return rolled_back;
            }
            *state = HandleState::Disposed;
        }
        tracing::debug!(txn_id = %self.id(), depth = self.depth, "handle disposed");

        let release = self.release.lock().take();
        let released = match release {
            Some(release) => release(),
            None => Ok(()),
        };
        rolled_back.and(released)
    }

    fn ensure_active(&self) -> TransactionResult<()> {
        match self.state() {
            HandleState::Active => Ok(()),
            HandleState::Disposed => Err(TransactionError::disposed()),
            _ => Err(TransactionError::not_active()),
        }
    }

    fn set_state(&self, next: HandleState) {
        let mut state = self.state.lock();
        let previous = *state;
        tracing::debug!(txn_id = %self.id(), from = %previous, to = %next, "handle state change");
        *state = next;
    }
}

impl fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("id", &self.id())
            .field("depth", &self.depth)
            .field("state", &self.state())
            .field("dependent", &self.is_dependent())
            .finish()
    }
}
