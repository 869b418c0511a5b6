//! txscope Core Types
//!
//! This crate provides the foundational types used throughout txscope:
//! - Identity types (TransactionId, ActivityId)
//! - Declared transaction options (IsolationLevel, ScopeMode, TransactionOptions)
//! - State enums shared by handles and physical transactions
//! - Coordinator configuration
//! - Common error messages

mod config;
mod id;
pub mod messages;
mod options;
mod state;

pub use config::*;
pub use id::*;
pub use options::*;
pub use state::*;
