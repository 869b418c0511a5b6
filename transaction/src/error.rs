//! Transaction error types.

use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;
use txscope_core::{messages, TransactionId, TransactionStatus};

/// A failure reported by one resource participant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("participant '{participant}' failed: {message}")]
pub struct ParticipantError {
    pub participant: String,
    pub message: String,
}

impl ParticipantError {
    pub fn new(participant: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            participant: participant.into(),
            message: message.into(),
        }
    }
}

/// One or more participants failed to roll back.
///
/// Every participant was still asked to roll back; `failures` lists all of
/// them in enlistment order and `first` repeats the earliest one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{count} participant(s) failed to roll back; first: {first}", count = .failures.len())]
pub struct RollbackFailure {
    first: ParticipantError,
    failures: Vec<ParticipantError>,
}

impl RollbackFailure {
    /// Build from collected failures, `None` when nothing failed.
    pub fn from_failures(failures: Vec<ParticipantError>) -> Option<Self> {
        let first = failures.first()?.clone();
        Some(Self { first, failures })
    }

    pub fn first(&self) -> &ParticipantError {
        &self.first
    }

    pub fn failures(&self) -> &[ParticipantError] {
        &self.failures
    }
}

/// Transaction errors.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The transaction could not start; nothing was pushed.
    #[error("transaction could not begin: {reason}")]
    BeginFailed { reason: String },

    /// Complete failed and the transaction was rolled back.
    #[error("transaction {txn} failed to commit: {cause}")]
    CommitFailed {
        txn: TransactionId,
        #[source]
        cause: Box<TransactionError>,
        /// Set when the automatic rollback itself failed.
        rollback: Option<RollbackFailure>,
    },

    /// The commit outcome is unknown.
    #[error("transaction {txn} is in doubt: {hint}")]
    InDoubt {
        txn: TransactionId,
        hint: String,
        failures: Vec<ParticipantError>,
    },

    /// Participants failed to roll back.
    #[error(transparent)]
    RollbackFailed(#[from] RollbackFailure),

    /// Participants failed during commit before any of them committed.
    #[error("{count} participant(s) failed to commit", count = .failures.len())]
    ParticipantsFailed { failures: Vec<ParticipantError> },

    /// A participant failed to start; the transaction is now rollback-only.
    #[error("participant could not start: {0}")]
    ParticipantStart(ParticipantError),

    /// The transaction outlived its timeout.
    #[error("transaction timed out after {limit:?}")]
    Timeout { limit: Duration },

    /// The transaction was marked rollback-only.
    #[error("transaction {txn} is marked rollback-only")]
    RollbackOnly { txn: TransactionId },

    /// A dependent tried to commit into a parent that is no longer active.
    #[error("parent transaction {parent} is {status}")]
    ParentInactive {
        parent: TransactionId,
        status: TransactionStatus,
    },

    /// State-machine contract breach. A programmer error; never retried.
    #[error("precondition violated: {message}")]
    Precondition { message: String },

    /// Engine-internal error.
    #[error("internal error: {message}")]
    Fatal { message: String },
}

impl TransactionError {
    pub fn begin_failed(reason: impl Into<String>) -> Self {
        Self::BeginFailed {
            reason: reason.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    pub fn in_doubt(txn: TransactionId, failures: Vec<ParticipantError>) -> Self {
        Self::InDoubt {
            txn,
            hint: messages::HINT_IN_DOUBT.to_string(),
            failures,
        }
    }

    pub fn not_active() -> Self {
        Self::precondition(messages::ERR_NOT_ACTIVE)
    }

    pub fn disposed() -> Self {
        Self::precondition(messages::ERR_DISPOSED)
    }

    /// Precondition and internal errors are fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Precondition { .. } | Self::Fatal { .. })
    }

    /// Whether re-running the work might succeed.
    ///
    /// Fatal errors never qualify, and neither does an in-doubt outcome or a
    /// failed rollback, since running again could apply work twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CommitFailed { cause, rollback, .. } => {
                rollback.is_none() && cause.is_retryable()
            }
            Self::InDoubt { .. }
            | Self::RollbackFailed(_)
            | Self::Precondition { .. }
            | Self::Fatal { .. } => false,
            _ => true,
        }
    }

    /// Find the first `TransactionError` in an error's source chain.
    pub fn find_in<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a TransactionError> {
        let mut current = Some(err);
        while let Some(e) = current {
            if let Some(found) = e.downcast_ref::<TransactionError>() {
                return Some(found);
            }
            current = e.source();
        }
        None
    }
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;
