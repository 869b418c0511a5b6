//! Common error messages used across txscope components.
//!
//! These constants keep the wording consistent between the handle, the
//! activity stack and the interceptor.

/// Error: a handle operation requires the Active state.
pub const ERR_NOT_ACTIVE: &str = "transaction handle is not active";

/// Error: a state-changing operation was attempted after Dispose.
pub const ERR_DISPOSED: &str = "transaction handle has been disposed";

/// Error: Begin called on a handle that already left Constructed.
pub const ERR_ALREADY_BEGUN: &str = "transaction handle has already begun";

/// Error: Pop called on an empty activity.
pub const ERR_EMPTY_ACTIVITY: &str = "cannot pop from an empty activity";

/// Error: a handle was released out of LIFO order.
pub const ERR_OUT_OF_ORDER_POP: &str = "transaction released out of nesting order";

/// Error: a fork without wait_all was requested through a borrowing entry point.
pub const ERR_DETACHED_FORK_BORROWED: &str =
    "detached forks need a 'static body; use spawn or spawn_in";

/// Hint attached to in-doubt failures.
pub const HINT_IN_DOUBT: &str = "some participants committed and others failed; \
inspect each failed participant and reconcile its state manually before retrying";
