//! Registry errors.

use thiserror::Error;

/// Errors that can occur while declaring methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Invalid method key '{0}': expected a path such as Type::method")]
    InvalidMethodKey(String),

    #[error("Duplicate method declaration: {0}")]
    DuplicateMethod(String),

    #[error("Method {0} sets wait_all without fork")]
    WaitAllWithoutFork(String),

    #[error("Method {0} declares a zero timeout")]
    ZeroTimeout(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
