//! Shared fixtures for txscope end-to-end tests.
//!
//! - [`Journal`]: ordered log of operations observed by participants and bodies
//! - [`RecordingParticipant`]: participant that journals its hooks and can fail on demand
//! - [`shop`]: an interceptor over a small order-processing method table

mod journal;

pub use fixture::{init_tracing, shop, shop_methods, shop_with, ShopError, ShopResult};
pub use journal::Journal;
pub use participant::{Failures, RecordingParticipant};

/// Method identifiers declared by [`shop_methods`].
pub mod methods {
    /// Required.
    pub const PLACE_ORDER: &str = "Shop::place_order";
    /// Required.
    pub const RESERVE_STOCK: &str = "Shop::reserve_stock";
    /// Required, serializable.
    pub const CHARGE: &str = "Shop::charge";
    /// Independent.
    pub const AUDIT: &str = "Shop::audit";
    /// Suppress.
    pub const QUOTE: &str = "Shop::quote";
    /// Fork, detached.
    pub const NOTIFY: &str = "Shop::notify";
    /// Fork, caller waits.
    pub const SHIP: &str = "Shop::ship";
    /// Required, 50ms timeout.
    pub const EXPRESS: &str = "Shop::express";
}

pub mod prelude {
    pub use crate::methods::*;
    pub use crate::{
        init_tracing, shop, shop_methods, shop_with, Failures, Journal, RecordingParticipant,
        ShopError, ShopResult,
    };
    pub use txscope_activity::{Activity, ActivityProvider};
    pub use txscope_coordinator::TransientFailures;
    pub use txscope_core::{
        CoordinatorConfig, HandleState, IsolationLevel, ScopeMode, TransactionStatus,
    };
    pub use txscope_intercept::{InterceptError, Interceptor, Invocation, Outcome};
    pub use txscope_transaction::{TransactionError, TransactionHandle};
}
