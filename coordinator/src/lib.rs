//! txscope Coordinator
//!
//! Decides, per invocation, whether to create an independent transaction, a
//! dependent one nested in the current transaction, or none at all.
//!
//! Responsibilities:
//! - Apply the scope mode and activity depth to pick a transaction kind
//! - Begin the handle before it becomes visible, then push it
//! - Keep the ordered table of named retry policies

mod coordinator;
mod error;
mod retry;

pub use coordinator::{CreatedTransaction, TransactionCoordinator};
pub use error::{CoordinatorError, CoordinatorResult};
pub use retry::{RetryPolicies, RetryPolicy, TransientFailures};
