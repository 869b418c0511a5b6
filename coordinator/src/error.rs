//! Coordinator error types.

use thiserror::Error;

/// Coordinator errors.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A retry policy with this key is already registered.
    #[error("retry policy already registered: {key}")]
    DuplicatePolicy { key: String },

    /// Retry policy keys must not be empty.
    #[error("retry policy key must not be empty")]
    EmptyPolicyKey,
}

impl CoordinatorError {
    pub fn duplicate_policy(key: impl Into<String>) -> Self {
        Self::DuplicatePolicy { key: key.into() }
    }
}

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
