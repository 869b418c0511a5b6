//! MethodTableBuilder for constructing an immutable MethodTable.

use std::collections::BTreeMap;
use std::time::Duration;

use txscope_core::{IsolationLevel, ScopeMode, TransactionOptions};

use crate::error::{RegistryError, RegistryResult};
use crate::key::MethodKey;
use crate::table::MethodTable;

/// Builder for constructing an immutable MethodTable.
#[derive(Debug, Default)]
pub struct MethodTableBuilder {
    methods: BTreeMap<MethodKey, TransactionOptions>,
}

impl MethodTableBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a transactional method. Options start at their defaults.
    pub fn declare(&mut self, method: impl Into<String>) -> MethodBuilder<'_> {
        MethodBuilder {
            builder: self,
            method: method.into(),
            options: TransactionOptions::default(),
        }
    }

    /// Declare a method with options built elsewhere, for example loaded
    /// from a configuration file.
    pub fn declare_options(
        &mut self,
        method: impl Into<String>,
        options: TransactionOptions,
    ) -> RegistryResult<MethodKey> {
        self.insert(method.into(), options)
    }

    /// Build the table.
    pub fn build(self) -> MethodTable {
        MethodTable::from_methods(self.methods)
    }

    fn insert(&mut self, method: String, options: TransactionOptions) -> RegistryResult<MethodKey> {
        let key = MethodKey::parse(method)?;
        if self.methods.contains_key(&key) {
            return Err(RegistryError::DuplicateMethod(key.to_string()));
        }
        if options.is_wait_all() && !options.is_fork() {
            return Err(RegistryError::WaitAllWithoutFork(key.to_string()));
        }
        if options.timeout() == Some(Duration::ZERO) {
            return Err(RegistryError::ZeroTimeout(key.to_string()));
        }

        self.methods.insert(key.clone(), options);
        Ok(key)
    }
}

/// Builder for a single method declaration.
pub struct MethodBuilder<'a> {
    builder: &'a mut MethodTableBuilder,
    method: String,
    options: TransactionOptions,
}

impl<'a> MethodBuilder<'a> {
    pub fn isolation(mut self, isolation: IsolationLevel) -> Self {
        self.options = self.options.with_isolation(isolation);
        self
    }

    pub fn scope(mut self, scope: ScopeMode) -> Self {
        self.options = self.options.with_scope(scope);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.options = self.options.with_read_only(true);
        self
    }

    /// Run the body on a separate worker under a dependent transaction.
    pub fn fork(mut self) -> Self {
        self.options = self.options.with_fork(true);
        self
    }

    /// Make the caller wait for the fork and see its error.
    pub fn wait_all(mut self) -> Self {
        self.options = self.options.with_wait_all(true);
        self
    }

    pub fn async_commit(mut self) -> Self {
        self.options = self.options.with_async_commit(true);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_timeout(timeout);
        self
    }

    /// Finish the declaration and validate it.
    pub fn done(self) -> RegistryResult<MethodKey> {
        self.builder.insert(self.method, self.options)
    }
}
