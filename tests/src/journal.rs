//! Ordered operation log shared between participants, bodies and assertions.

use std::sync::Arc;

use parking_lot::Mutex;

/// Cloning yields another reference to the same log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Entries ending in `:{operation}`, such as every `commit`.
    pub fn count(&self, operation: &str) -> usize {
        let suffix = format!(":{}", operation);
        self.entries
            .lock()
            .iter()
            .filter(|e| e.ends_with(&suffix))
            .count()
    }

    /// Position of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
