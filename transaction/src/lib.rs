//! txscope Transaction
//!
//! Physical transactions and the handle state machine that wraps them.
//!
//! Responsibilities:
//! - Start independent and dependent physical transactions
//! - Hold the ordered, duplicate-free set of enlisted participants
//! - Block a parent's commit until its dependents settle
//! - Drive Begin/Complete/Rollback/Dispose on a handle with idempotent termination
//! - Aggregate participant failures

mod error;
mod handle;
mod participant;
mod transaction;

pub use error::{ParticipantError, RollbackFailure, TransactionError, TransactionResult};
pub use handle::TransactionHandle;
pub use participant::{Enlistments, ParticipantResult, ResourceParticipant};
pub use transaction::{Transaction, TransactionInfo};
