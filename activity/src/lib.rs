//! txscope Activity
//!
//! The nesting stack of one logical flow, and the provider that hands the
//! right stack to the code running now.
//!
//! Responsibilities:
//! - Keep pushed handles strictly LIFO and pop each exactly once
//! - Answer current / outermost transaction queries
//! - Create an activity for a flow on first use
//! - Derive detached activities for forked and suppressed work

mod activity;
mod provider;

pub use activity::Activity;
pub use provider::{ActivityProvider, ActivityScope, ThreadActivityProvider};
