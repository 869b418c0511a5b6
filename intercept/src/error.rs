//! Interception errors.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use thiserror::Error;
use txscope_coordinator::CoordinatorError;
use txscope_core::TransactionId;
use txscope_registry::RegistryError;
use txscope_transaction::TransactionError;

/// Errors raised by the interception point itself.
///
/// Body errors pass through untouched; these are only the failures the
/// interceptor adds around them.
#[derive(Debug, Error)]
pub enum InterceptError {
    #[error("transaction error")]
    Transaction(#[from] TransactionError),

    #[error("invalid method declaration")]
    Registry(#[from] RegistryError),

    #[error("retry policy rejected")]
    Coordinator(#[from] CoordinatorError),

    #[error("method {method} is not declared as transactional")]
    UndeclaredMethod { method: String },

    #[error("forked invocation of {method} under {txn} panicked")]
    ForkPanicked { method: String, txn: TransactionId },

    #[error("could not start a fork worker: {0}")]
    Spawn(#[source] io::Error),

    /// An application failure, for bodies that use `InterceptError` as
    /// their own error type.
    #[error(transparent)]
    Application(Box<dyn StdError + Send + Sync>),
}

impl InterceptError {
    pub fn undeclared(method: impl Into<String>) -> Self {
        Self::UndeclaredMethod {
            method: method.into(),
        }
    }

    pub fn fork_panicked(method: impl Into<String>, txn: TransactionId) -> Self {
        Self::ForkPanicked {
            method: method.into(),
            txn,
        }
    }

    pub fn application(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Application(error.into())
    }

    /// The wrapped transaction error, if this is one.
    pub fn transaction_error(&self) -> Option<&TransactionError> {
        match self {
            Self::Transaction(e) => Some(e),
            _ => None,
        }
    }

    /// True for contract breaches by the caller.
    pub fn is_precondition(&self) -> bool {
        match self {
            Self::UndeclaredMethod { .. } => true,
            Self::Transaction(e) => matches!(e, TransactionError::Precondition { .. }),
            _ => false,
        }
    }
}

pub type InterceptResult<T> = Result<T, InterceptError>;

/// Error types a transactional body may return.
///
/// The interceptor needs to fold its own failures into the body's error
/// type and to offer failures to retry policies.
pub trait InvocationError: StdError + From<InterceptError> + Send + 'static {}

impl<E> InvocationError for E where E: StdError + From<InterceptError> + Send + 'static {}

/// Displays an error followed by each of its sources, separated by `: `.
pub(crate) struct ErrorChain<'a>(pub(crate) &'a (dyn StdError + 'static));

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(e) = source {
            write!(f, ": {}", e)?;
            source = e.source();
        }
        Ok(())
    }
}

pub(crate) fn lift<E: From<InterceptError>>(error: impl Into<InterceptError>) -> E {
    E::from(error.into())
}
