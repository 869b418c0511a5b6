//! Interceptor - the explicit wrapper around transactional calls.
//!
//! For each call:
//! 1. Resolve the method's options and ask the coordinator for a handle.
//! 2. No handle (Suppress): run the body on a detached activity.
//! 3. A handle: run the body with it current, complete on success or roll
//!    back on failure, and always dispose.
//! 4. A forked handle: do step 3 on a worker thread under an activity
//!    derived from the caller's, either waiting for it or not.

use std::fmt;
use std::sync::Arc;
use std::thread;

use txscope_activity::{Activity, ActivityProvider, ActivityScope};
use txscope_coordinator::{RetryPolicy, TransactionCoordinator};
use txscope_core::{messages, ScopeMode, TransactionId, TransactionOptions};
use txscope_registry::MethodTable;
use txscope_transaction::{TransactionError, TransactionHandle};

use crate::error::{lift, ErrorChain, InterceptError, InterceptResult, InvocationError};
use crate::fork::{ForkHandle, Outcome};
use crate::guard::HandleGuard;
use crate::invocation::Invocation;

/// The interception point for declared transactional methods.
///
/// Cheap to clone; clones share the coordinator, method table and provider.
#[derive(Clone)]
pub struct Interceptor {
    coordinator: Arc<TransactionCoordinator>,
    methods: Arc<MethodTable>,
    provider: Arc<dyn ActivityProvider>,
}

impl Interceptor {
    pub fn new<P>(coordinator: Arc<TransactionCoordinator>, methods: MethodTable, provider: P) -> Self
    where
        P: ActivityProvider + 'static,
    {
        Self {
            coordinator,
            methods: Arc::new(methods),
            provider: Arc::new(provider),
        }
    }

    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    /// The calling flow's activity.
    pub fn current_activity(&self) -> Activity {
        self.provider.current()
    }

    /// Register a named retry policy with the coordinator.
    pub fn add_retry_policy<P>(&self, key: impl Into<String>, policy: P) -> InterceptResult<()>
    where
        P: RetryPolicy + 'static,
    {
        Ok(self.coordinator.add_retry_policy(key, policy)?)
    }

    // ========== Entry Points ==========

    /// Invoke `method` in the calling flow's activity.
    pub fn invoke<T, E, F>(&self, method: &str, body: F) -> Result<T, E>
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E> + Send,
        T: Send,
        E: InvocationError,
    {
        let activity = self.provider.current();
        self.invoke_in(&activity, method, body)
    }

    /// Invoke `method` in an explicit activity.
    ///
    /// The body may run more than once when a retry policy claims its
    /// failure. A fork that waits runs on a scoped worker thread; a detached
    /// fork needs [`Interceptor::spawn_in`].
    pub fn invoke_in<T, E, F>(&self, activity: &Activity, method: &str, mut body: F) -> Result<T, E>
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E> + Send,
        T: Send,
        E: InvocationError,
    {
        let options = self.options_for(method).map_err(E::from)?;
        if forks_detached(&options, activity) {
            return Err(lift(TransactionError::precondition(format!(
                "{} ({})",
                messages::ERR_DETACHED_FORK_BORROWED,
                method
            ))));
        }

        let _scope = ActivityScope::enter(self.provider.as_ref(), activity.clone());
        let top_level = options.scope() == ScopeMode::Independent
            || (options.scope() == ScopeMode::Required && activity.is_empty());

        let mut attempt = 1;
        loop {
            let (result, handle) = self.attempt(activity, method, &options, attempt, &mut body);
            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let claimed = if top_level {
                self.coordinator.claim_retry(&error, attempt)
            } else {
                None
            };
            let Some(policy) = claimed else {
                return Err(error);
            };

            if let Some(handle) = &handle {
                handle.record_failed_policy(policy.clone());
            }
            tracing::warn!(
                method,
                attempt,
                policy = %policy,
                error = %ErrorChain(&error),
                "retrying transactional invocation"
            );
            attempt += 1;
        }
    }

    /// Invoke `method` in the calling flow's activity, allowing a detached
    /// fork.
    pub fn spawn<T, E, F>(&self, method: &str, body: F) -> Result<Outcome<T, E>, E>
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: InvocationError,
    {
        let activity = self.provider.current();
        self.spawn_in(&activity, method, body)
    }

    /// Invoke `method` in an explicit activity, allowing a detached fork.
    ///
    /// A detached fork returns [`Outcome::Forked`] as soon as its worker has
    /// started. Its errors surface only through [`ForkHandle::join`]; they
    /// never reach the caller otherwise. Every other invocation behaves as
    /// [`Interceptor::invoke_in`].
    pub fn spawn_in<T, E, F>(&self, activity: &Activity, method: &str, mut body: F) -> Result<Outcome<T, E>, E>
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: InvocationError,
    {
        let options = self.options_for(method).map_err(E::from)?;
        if !forks_detached(&options, activity) {
            return self.invoke_in(activity, method, body).map(Outcome::Completed);
        }

        let guard = match self.coordinator.create_transaction(activity, &options) {
            Ok(Some(created)) if created.should_fork() => HandleGuard::new(created.into_handle()),
            Ok(Some(created)) => {
                let guard = HandleGuard::new(created.into_handle());
                return self
                    .run_body(activity, method, guard, &mut body, 1)
                    .map(Outcome::Completed);
            }
            Ok(None) => {
                return self
                    .run_suppressed(activity, method, &mut body, 1)
                    .map(Outcome::Completed)
            }
            Err(e) => return Err(lift(e)),
        };

        let txn = guard.handle().id();
        let child = self.provider.fork(activity);
        let interceptor = self.clone();
        let owned_method = method.to_string();
        let worker = thread::Builder::new()
            .name(self.fork_thread_name(txn))
            .spawn(move || {
                let result = interceptor.run_forked(&child, &owned_method, guard, &mut body);
                if let Err(error) = &result {
                    tracing::warn!(
                        method = %owned_method,
                        txn_id = %txn,
                        error = %ErrorChain(error),
                        "detached fork failed"
                    );
                }
                result
            })
            .map_err(|e| E::from(InterceptError::Spawn(e)))?;

        tracing::debug!(method, txn_id = %txn, "detached fork started");
        Ok(Outcome::Forked(ForkHandle::new(method.to_string(), txn, worker)))
    }

    // ========== Execution ==========

    /// One attempt: create the transaction and run the body under it.
    ///
    /// Returns the attempt's handle alongside the result so a retry can
    /// record the policy that claimed it.
    fn attempt<T, E, F>(
        &self,
        activity: &Activity,
        method: &str,
        options: &TransactionOptions,
        attempt: u32,
        body: &mut F,
    ) -> (Result<T, E>, Option<Arc<TransactionHandle>>)
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E> + Send,
        T: Send,
        E: InvocationError,
    {
        match self.coordinator.create_transaction(activity, options) {
            Err(e) => (Err(lift(e)), None),
            Ok(None) => (self.run_suppressed(activity, method, body, attempt), None),
            Ok(Some(created)) => {
                let handle = created.handle().clone();
                let fork = created.should_fork();
                let guard = HandleGuard::new(created.into_handle());
                let result = if fork {
                    self.run_fork_joined(activity, method, guard, body)
                } else {
                    self.run_body(activity, method, guard, body, attempt)
                };
                (result, Some(handle))
            }
        }
    }

    /// Run the body with `guard`'s handle on top of `activity`.
    fn run_body<T, E, F>(
        &self,
        activity: &Activity,
        method: &str,
        guard: HandleGuard,
        body: &mut F,
        attempt: u32,
    ) -> Result<T, E>
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E>,
        E: From<InterceptError>,
    {
        let outcome = {
            let invocation = Invocation::new(self, activity, method, Some(guard.handle()), attempt);
            body(&invocation)
        };
        guard.finish(outcome)
    }

    /// Run the body with no ambient transaction visible to nested calls.
    fn run_suppressed<T, E, F>(
        &self,
        activity: &Activity,
        method: &str,
        body: &mut F,
        attempt: u32,
    ) -> Result<T, E>
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E>,
    {
        let detached = activity.derive();
        let _scope = ActivityScope::enter(self.provider.as_ref(), detached.clone());
        tracing::trace!(method, activity = %detached.id(), "running without a transaction");
        let invocation = Invocation::new(self, &detached, method, None, attempt);
        body(&invocation)
    }

    /// Run a fork on a scoped worker and wait for it.
    fn run_fork_joined<T, E, F>(
        &self,
        activity: &Activity,
        method: &str,
        guard: HandleGuard,
        body: &mut F,
    ) -> Result<T, E>
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E> + Send,
        T: Send,
        E: InvocationError,
    {
        let txn = guard.handle().id();
        let child = self.provider.fork(activity);
        let name = self.fork_thread_name(txn);

        thread::scope(|scope| {
            let worker = thread::Builder::new()
                .name(name)
                .spawn_scoped(scope, move || self.run_forked(&child, method, guard, body));
            match worker {
                Ok(worker) => worker
                    .join()
                    .unwrap_or_else(|_| Err(lift(InterceptError::fork_panicked(method, txn)))),
                Err(e) => Err(lift(InterceptError::Spawn(e))),
            }
        })
    }

    /// Body of a fork worker: adopt the derived activity, push the handle on
    /// it and run the body there.
    fn run_forked<T, E, F>(&self, child: &Activity, method: &str, guard: HandleGuard, body: &mut F) -> Result<T, E>
    where
        F: FnMut(&Invocation<'_>) -> Result<T, E>,
        E: From<InterceptError>,
    {
        let _scope = ActivityScope::enter(self.provider.as_ref(), child.clone());
        child
            .push(guard.handle().clone())
            .map_err(|e| E::from(InterceptError::from(e)))?;
        tracing::debug!(
            method,
            txn_id = %guard.handle().id(),
            activity = %child.id(),
            "fork running"
        );
        self.run_body(child, method, guard, body, 1)
    }

    // ========== Helpers ==========

    fn options_for(&self, method: &str) -> InterceptResult<TransactionOptions> {
        if let Some(options) = self.methods.get(method) {
            return Ok(options.clone());
        }
        if self.coordinator.config().strict_declarations {
            return Err(InterceptError::undeclared(method));
        }
        tracing::debug!(method, "undeclared method runs with default options");
        Ok(self.coordinator.config().default_options.clone())
    }

    fn fork_thread_name(&self, txn: TransactionId) -> String {
        format!("{}-{}", self.coordinator.config().fork_thread_prefix, txn)
    }
}

/// True if an invocation with `options` on `activity` would fork without
/// the caller waiting for it.
fn forks_detached(options: &TransactionOptions, activity: &Activity) -> bool {
    options.scope() != ScopeMode::Suppress
        && options.should_fork(activity.count() + 1)
        && !options.is_wait_all()
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("methods", &self.methods.len())
            .field("config", self.coordinator.config())
            .finish()
    }
}
