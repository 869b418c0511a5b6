//! MethodTable - immutable method declarations.

use std::collections::BTreeMap;

use txscope_core::TransactionOptions;

use crate::key::MethodKey;

/// Immutable table mapping method identifiers to their options.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    methods: BTreeMap<MethodKey, TransactionOptions>,
}

impl MethodTable {
    pub(crate) fn from_methods(methods: BTreeMap<MethodKey, TransactionOptions>) -> Self {
        Self { methods }
    }

    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Lookups ====================

    /// Options declared for `method`.
    pub fn get(&self, method: &str) -> Option<&TransactionOptions> {
        self.methods.get(method)
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Declared methods, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &MethodKey> {
        self.methods.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MethodKey, &TransactionOptions)> {
        self.methods.iter()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
