//! Lifecycle states.

use std::fmt;

/// State of a transaction handle.
///
/// ```text
/// Constructed -> Active -> { Committed | Aborted | InDoubt } -> Disposed
///                  |                                              ^
///                  +----------- (implicit rollback) --------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    /// Created, underlying transaction not started yet.
    Constructed,
    /// Underlying transaction started; work may be enlisted.
    Active,
    /// Completed successfully.
    Committed,
    /// Rolled back.
    Aborted,
    /// Commit outcome is unknown.
    InDoubt,
    /// Released from its activity. Terminal.
    Disposed,
}

impl HandleState {
    /// True for the three outcome states reachable from Active.
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            HandleState::Committed | HandleState::Aborted | HandleState::InDoubt
        )
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleState::Constructed => "constructed",
            HandleState::Active => "active",
            HandleState::Committed => "committed",
            HandleState::Aborted => "aborted",
            HandleState::InDoubt => "in doubt",
            HandleState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Status of a physical transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// Created but not started.
    Pending,
    /// Started and accepting enlistments.
    Active,
    /// Committed. For a dependent transaction this means its work was handed
    /// to the parent and now shares the parent's outcome.
    Committed,
    /// Rolled back.
    Aborted,
    /// Some participants committed, some failed.
    InDoubt,
}

impl TransactionStatus {
    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed | TransactionStatus::Aborted | TransactionStatus::InDoubt
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Active => "active",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Aborted => "aborted",
            TransactionStatus::InDoubt => "in doubt",
        };
        f.write_str(name)
    }
}
