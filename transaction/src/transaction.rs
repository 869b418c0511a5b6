//! In-process physical transactions.
//!
//! A root transaction is independent. A dependent transaction is started
//! under a parent and gates the parent's commit: the parent waits on its
//! `settled` condition until every registered dependent has committed or
//! rolled back. A dependent waits for its own dependents the same way before
//! it commits. A committed dependent hands its participants to the parent,
//! so their outcome follows the parent's outcome.
//!
//! Lock order is child before parent. A root never locks its dependents.

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use txscope_core::{messages, IsolationLevel, TransactionId, TransactionStatus};

use crate::error::{TransactionError, TransactionResult};
use crate::participant::{Enlistments, ResourceParticipant};

/// Immutable facts about a physical transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    pub id: TransactionId,
    /// Parent transaction, for dependents.
    pub parent: Option<TransactionId>,
    pub isolation: IsolationLevel,
    pub timeout: Option<Duration>,
    pub read_only: bool,
}

#[derive(Debug)]
struct State {
    status: TransactionStatus,
    rollback_only: bool,
    enlistments: Enlistments,
    /// Dependents started but not yet settled.
    outstanding: usize,
    /// This dependent is counted in its parent's `outstanding`.
    registered: bool,
    started_at: Option<Instant>,
}

struct Shared {
    info: TransactionInfo,
    parent: Option<Transaction>,
    state: Mutex<State>,
    settled: Condvar,
}

/// A physical transaction. Clones share the same transaction.
#[derive(Clone)]
pub struct Transaction {
    shared: Arc<Shared>,
}

impl Transaction {
    /// Create an independent transaction. It must be started before use.
    pub fn independent(
        isolation: IsolationLevel,
        timeout: Option<Duration>,
        read_only: bool,
    ) -> Self {
        let info = TransactionInfo {
            id: TransactionId::next(),
            parent: None,
            isolation,
            timeout,
            read_only,
        };
        Self::from_parts(info, None)
    }

    /// Create a transaction that blocks `parent`'s commit until it settles.
    ///
    /// The dependent inherits the parent's isolation level, timeout and
    /// read-only flag.
    pub fn dependent(parent: &Transaction) -> Self {
        let parent_info = parent.info();
        let info = TransactionInfo {
            id: TransactionId::next(),
            parent: Some(parent_info.id),
            isolation: parent_info.isolation,
            timeout: parent_info.timeout,
            read_only: parent_info.read_only,
        };
        Self::from_parts(info, Some(parent.clone()))
    }

    fn from_parts(info: TransactionInfo, parent: Option<Transaction>) -> Self {
        Self {
            shared: Arc::new(Shared {
                info,
                parent,
                state: Mutex::new(State {
                    status: TransactionStatus::Pending,
                    rollback_only: false,
                    enlistments: Enlistments::new(),
                    outstanding: 0,
                    registered: false,
                    started_at: None,
                }),
                settled: Condvar::new(),
            }),
        }
    }

    // ========== Accessors ==========

    pub fn info(&self) -> &TransactionInfo {
        &self.shared.info
    }

    pub fn id(&self) -> TransactionId {
        self.shared.info.id
    }

    pub fn parent(&self) -> Option<&Transaction> {
        self.shared.parent.as_ref()
    }

    pub fn is_dependent(&self) -> bool {
        self.shared.parent.is_some()
    }

    pub fn status(&self) -> TransactionStatus {
        self.shared.state.lock().status
    }

    pub fn is_rollback_only(&self) -> bool {
        self.shared.state.lock().rollback_only
    }

    /// Number of enlisted participants.
    pub fn enlistment_count(&self) -> usize {
        self.shared.state.lock().enlistments.len()
    }

    /// Dependents that have started but not yet committed or rolled back.
    pub fn outstanding_dependents(&self) -> usize {
        self.shared.state.lock().outstanding
    }

    /// True if both values refer to the same physical transaction.
    pub fn same_as(&self, other: &Transaction) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // ========== Lifecycle ==========

    /// Start the transaction: Pending -> Active.
    ///
    /// A dependent registers with its parent's gate and fails to start if the
    /// parent is not active or already doomed.
    pub fn start(&self) -> TransactionResult<()> {
        let mut state = self.shared.state.lock();
        if state.status != TransactionStatus::Pending {
            return Err(TransactionError::precondition(messages::ERR_ALREADY_BEGUN));
        }

        if let Some(parent) = &self.shared.parent {
            let mut parent_state = parent.shared.state.lock();
            if parent_state.status != TransactionStatus::Active {
                return Err(TransactionError::begin_failed(format!(
                    "parent transaction {} is {}",
                    parent.id(),
                    parent_state.status
                )));
            }
            if parent_state.rollback_only {
                return Err(TransactionError::begin_failed(format!(
                    "parent transaction {} is marked rollback-only",
                    parent.id()
                )));
            }
            parent_state.outstanding += 1;
            state.registered = true;
        }

        state.status = TransactionStatus::Active;
        state.started_at = Some(Instant::now());
        tracing::debug!(
            txn_id = %self.id(),
            parent = ?self.shared.info.parent,
            isolation = %self.shared.info.isolation,
            "transaction started"
        );
        Ok(())
    }

    /// Enlist a participant and run its `start` hook.
    ///
    /// Returns `Ok(false)` if the participant was already enlisted. A failing
    /// `start` leaves the participant enlisted, so it still receives
    /// `rollback`, and marks the transaction rollback-only.
    pub fn enlist(&self, participant: Arc<dyn ResourceParticipant>) -> TransactionResult<bool> {
        {
            let mut state = self.shared.state.lock();
            if state.status != TransactionStatus::Active {
                return Err(TransactionError::not_active());
            }
            if !state.enlistments.insert(participant.clone()) {
                return Ok(false);
            }
        }

        if let Err(e) = participant.start() {
            tracing::warn!(
                txn_id = %self.id(),
                participant = participant.name(),
                error = %e,
                "participant failed to start; transaction marked rollback-only"
            );
            self.set_rollback_only();
            return Err(TransactionError::ParticipantStart(e));
        }

        tracing::trace!(txn_id = %self.id(), participant = participant.name(), "participant enlisted");
        Ok(true)
    }

    /// Doom the transaction: any later commit rolls back instead.
    pub fn set_rollback_only(&self) {
        self.shared.state.lock().rollback_only = true;
    }

    /// Commit the transaction.
    ///
    /// On failure other than [`TransactionError::InDoubt`] the transaction is
    /// left active with its enlistments intact, and the caller must roll it
    /// back.
    pub fn commit(&self) -> TransactionResult<()> {
        match &self.shared.parent {
            Some(parent) => self.commit_dependent(parent),
            None => self.commit_independent(),
        }
    }

    fn commit_dependent(&self, parent: &Transaction) -> TransactionResult<()> {
        let mut state = self.shared.state.lock();
        if state.status != TransactionStatus::Active {
            return Err(TransactionError::not_active());
        }

        // Settle our own dependents before touching the parent's lock.
        self.wait_for_dependents(&mut state)?;

        if state.status != TransactionStatus::Active {
            return Err(TransactionError::not_active());
        }
        if state.rollback_only {
            return Err(TransactionError::RollbackOnly { txn: self.id() });
        }

        let mut parent_state = parent.shared.state.lock();
        if parent_state.status != TransactionStatus::Active {
            return Err(TransactionError::ParentInactive {
                parent: parent.id(),
                status: parent_state.status,
            });
        }

        let handed_over = mem::take(&mut state.enlistments);
        let count = handed_over.len();
        parent_state.enlistments.absorb(handed_over);
        release_gate(&mut state, &mut parent_state);
        state.status = TransactionStatus::Committed;
        drop(parent_state);
        parent.shared.settled.notify_all();

        tracing::debug!(
            txn_id = %self.id(),
            parent = %parent.id(),
            handed_over = count,
            "dependent transaction completed"
        );
        Ok(())
    }

    fn commit_independent(&self) -> TransactionResult<()> {
        let mut state = self.shared.state.lock();
        if state.status != TransactionStatus::Active {
            return Err(TransactionError::not_active());
        }

        self.wait_for_dependents(&mut state)?;

        if state.rollback_only {
            return Err(TransactionError::RollbackOnly { txn: self.id() });
        }

        // Detach the participants so no lock is held while their hooks run.
        let participants = mem::take(&mut state.enlistments);
        drop(state);

        let (committed, failures) = participants.commit_all();

        let mut state = self.shared.state.lock();
        if failures.is_empty() {
            state.status = TransactionStatus::Committed;
            tracing::debug!(txn_id = %self.id(), participants = committed, "transaction committed");
            return Ok(());
        }

        if committed == 0 {
            state.enlistments = participants;
            return Err(TransactionError::ParticipantsFailed { failures });
        }

        state.status = TransactionStatus::InDoubt;
        tracing::warn!(
            txn_id = %self.id(),
            committed,
            failed = failures.len(),
            "transaction in doubt"
        );
        Err(TransactionError::in_doubt(self.id(), failures))
    }

    /// Block until every dependent has settled, bounded by the timeout.
    fn wait_for_dependents(&self, state: &mut MutexGuard<'_, State>) -> TransactionResult<()> {
        let limit = self.shared.info.timeout;
        let deadline = match (limit, state.started_at) {
            (Some(limit), Some(started_at)) => Some(started_at + limit),
            _ => None,
        };

        while state.outstanding > 0 {
            tracing::trace!(
                txn_id = %self.id(),
                outstanding = state.outstanding,
                "waiting for dependent transactions"
            );
            match deadline {
                Some(deadline) => {
                    if self.shared.settled.wait_until(state, deadline).timed_out()
                        && state.outstanding > 0
                    {
                        break;
                    }
                }
                None => self.shared.settled.wait(state),
            }
        }

        if let (Some(limit), Some(deadline)) = (limit, deadline) {
            if Instant::now() >= deadline {
                tracing::warn!(txn_id = %self.id(), ?limit, "transaction timed out");
                return Err(TransactionError::Timeout { limit });
            }
        }
        Ok(())
    }

    /// Roll back: Pending or Active -> Aborted.
    ///
    /// Idempotent once aborted. Every participant is asked once; failures are
    /// aggregated. A dependent also dooms its parent and releases the
    /// parent's gate.
    pub fn rollback(&self) -> TransactionResult<()> {
        let mut state = self.shared.state.lock();
        match state.status {
            TransactionStatus::Aborted => return Ok(()),
            TransactionStatus::Committed | TransactionStatus::InDoubt => {
                return Err(TransactionError::precondition(format!(
                    "cannot roll back a {} transaction",
                    state.status
                )));
            }
            TransactionStatus::Pending | TransactionStatus::Active => {}
        }

        state.status = TransactionStatus::Aborted;
        let participants = mem::take(&mut state.enlistments);

        if let Some(parent) = &self.shared.parent {
            let mut parent_state = parent.shared.state.lock();
            parent_state.rollback_only = true;
            if state.registered {
                release_gate(&mut state, &mut parent_state);
                drop(parent_state);
                parent.shared.settled.notify_all();
            }
        }
        drop(state);

        tracing::debug!(
            txn_id = %self.id(),
            participants = participants.len(),
            "transaction rolled back"
        );
        participants.rollback_all()?;
        Ok(())
    }
}

fn release_gate(state: &mut State, parent_state: &mut State) {
    if state.registered {
        state.registered = false;
        parent_state.outstanding = parent_state.outstanding.saturating_sub(1);
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("info", &self.shared.info)
            .field("status", &self.status())
            .finish()
    }
}
