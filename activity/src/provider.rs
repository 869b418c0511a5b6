//! Activity providers: which activity belongs to the code running now.

use std::cell::RefCell;

use crate::Activity;

/// Supplies the activity of the calling flow and derives activities for forks.
pub trait ActivityProvider: Send + Sync {
    /// The calling flow's activity, created on first use.
    fn current(&self) -> Activity;

    /// Install `activity` as the calling flow's activity, returning the
    /// previous one. `None` clears it.
    fn replace(&self, activity: Option<Activity>) -> Option<Activity>;

    /// Derive the activity a forked unit of work runs with.
    fn fork(&self, parent: &Activity) -> Activity {
        parent.derive()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Activity>> = const { RefCell::new(None) };
}

/// One activity per OS thread.
///
/// Synchronous nested calls on a thread share its activity implicitly. Work
/// moved to another thread must be handed an activity explicitly, which the
/// interceptor does for forks.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadActivityProvider;

impl ThreadActivityProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ActivityProvider for ThreadActivityProvider {
    fn current(&self) -> Activity {
        CURRENT.with(|current| {
            current
                .borrow_mut()
                .get_or_insert_with(|| {
                    let activity = Activity::new();
                    tracing::trace!(activity = %activity.id(), "activity created for thread");
                    activity
                })
                .clone()
        })
    }

    fn replace(&self, activity: Option<Activity>) -> Option<Activity> {
        CURRENT.with(|current| std::mem::replace(&mut *current.borrow_mut(), activity))
    }
}

/// Guard that installs an activity as current and restores the previous one
/// when dropped.
pub struct ActivityScope<'p> {
    provider: &'p dyn ActivityProvider,
    previous: Option<Activity>,
}

impl<'p> ActivityScope<'p> {
    pub fn enter(provider: &'p dyn ActivityProvider, activity: Activity) -> Self {
        let previous = provider.replace(Some(activity));
        Self { provider, previous }
    }
}

impl Drop for ActivityScope<'_> {
    fn drop(&mut self) {
        self.provider.replace(self.previous.take());
    }
}
