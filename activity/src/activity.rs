//! Activity: the ordered stack of transaction handles of one logical flow.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use txscope_core::{messages, ActivityId, TransactionId};
use txscope_transaction::{TransactionError, TransactionHandle, TransactionResult};

struct Inner {
    id: ActivityId,
    parent: Option<ActivityId>,
    stack: Mutex<Vec<Arc<TransactionHandle>>>,
}

impl Inner {
    fn pop(&self) -> TransactionResult<Arc<TransactionHandle>> {
        let handle = self
            .stack
            .lock()
            .pop()
            .ok_or_else(|| TransactionError::precondition(messages::ERR_EMPTY_ACTIVITY))?;
        tracing::trace!(activity = %self.id, txn_id = %handle.id(), "popped");
        Ok(handle)
    }

    /// Pop `expected`, which must be on top.
    fn release(&self, expected: TransactionId) -> TransactionResult<()> {
        let mut stack = self.stack.lock();
        match stack.last() {
            Some(top) if top.id() == expected => {
                stack.pop();
                tracing::trace!(activity = %self.id, txn_id = %expected, depth = stack.len(), "released");
                Ok(())
            }
            Some(top) => Err(TransactionError::precondition(format!(
                "{}: expected {} on top of {}, found {}",
                messages::ERR_OUT_OF_ORDER_POP,
                expected,
                self.id,
                top.id()
            ))),
            None => Err(TransactionError::precondition(messages::ERR_EMPTY_ACTIVITY)),
        }
    }
}

/// The transaction stack of one logical flow.
///
/// Cloning yields another reference to the same flow. An activity must only
/// be mutated by its own flow; concurrent flows use distinct activities,
/// obtained with [`Activity::derive`].
#[derive(Clone)]
pub struct Activity {
    inner: Arc<Inner>,
}

impl Activity {
    /// Create an activity for a new top-level flow.
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<ActivityId>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: ActivityId::random(),
                parent,
                stack: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Derive an empty activity for forked or suppressed work.
    pub fn derive(&self) -> Self {
        let child = Self::with_parent(Some(self.inner.id));
        tracing::trace!(parent = %self.inner.id, child = %child.id(), "activity derived");
        child
    }

    pub fn id(&self) -> ActivityId {
        self.inner.id
    }

    /// The activity this one was derived from.
    pub fn parent_id(&self) -> Option<ActivityId> {
        self.inner.parent
    }

    /// True if both values refer to the same flow.
    pub fn same_as(&self, other: &Activity) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ========== Stack ==========

    /// Push a handle and wire its release callback to pop it.
    pub fn push(&self, handle: Arc<TransactionHandle>) -> TransactionResult<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let id = handle.id();
        handle.on_release(move || match weak.upgrade() {
            Some(inner) => inner.release(id),
            // The flow is gone; there is no stack left to pop.
            None => Ok(()),
        })?;

        let mut stack = self.inner.stack.lock();
        stack.push(handle);
        tracing::trace!(activity = %self.inner.id, txn_id = %id, depth = stack.len(), "pushed");
        Ok(())
    }

    /// Remove and return the top handle.
    pub fn pop(&self) -> TransactionResult<Arc<TransactionHandle>> {
        self.inner.pop()
    }

    // ========== Queries ==========

    /// The innermost handle, if any.
    pub fn current_transaction(&self) -> Option<Arc<TransactionHandle>> {
        self.inner.stack.lock().last().cloned()
    }

    /// The outermost handle, if any.
    pub fn current_top_transaction(&self) -> Option<Arc<TransactionHandle>> {
        self.inner.stack.lock().first().cloned()
    }

    pub fn count(&self) -> usize {
        self.inner.stack.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

impl Default for Activity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activity")
            .field("id", &self.inner.id)
            .field("parent", &self.inner.parent)
            .field("count", &self.count())
            .finish()
    }
}
