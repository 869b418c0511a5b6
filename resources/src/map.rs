//! In-memory keyed store with transactional writers.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use txscope_transaction::{ParticipantResult, ResourceParticipant};

enum Change<K, V> {
    Put(K, V),
    Remove(K),
}

/// A shared map whose writes go through per-transaction [`MapWriter`]s.
///
/// Readers see only committed state.
pub struct TransactionalMap<K, V> {
    name: Arc<str>,
    committed: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for TransactionalMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            committed: self.committed.clone(),
        }
    }
}

impl<K, V> TransactionalMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            committed: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.committed.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.committed.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.committed.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.read().is_empty()
    }

    /// Copy of the committed state.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.committed.read().clone()
    }

    /// A writer for one transaction. Enlist it before writing.
    pub fn writer(&self) -> Arc<MapWriter<K, V>> {
        Arc::new(MapWriter {
            name: format!("map:{}", self.name),
            committed: self.committed.clone(),
            pending: Mutex::new(Vec::new()),
        })
    }
}

impl<K, V> fmt::Debug for TransactionalMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionalMap")
            .field("name", &self.name)
            .field("len", &self.committed.read().len())
            .finish()
    }
}

/// Buffers the writes of one transaction against a [`TransactionalMap`].
pub struct MapWriter<K, V> {
    name: String,
    committed: Arc<RwLock<HashMap<K, V>>>,
    pending: Mutex<Vec<Change<K, V>>>,
}

impl<K, V> MapWriter<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn put(&self, key: K, value: V) {
        self.pending.lock().push(Change::Put(key, value));
    }

    pub fn remove(&self, key: K) {
        self.pending.lock().push(Change::Remove(key));
    }

    /// Read through this writer's pending changes, then committed state.
    pub fn get(&self, key: &K) -> Option<V> {
        let pending = self.pending.lock();
        for change in pending.iter().rev() {
            match change {
                Change::Put(k, v) if k == key => return Some(v.clone()),
                Change::Remove(k) if k == key => return None,
                _ => {}
            }
        }
        drop(pending);
        self.committed.read().get(key).cloned()
    }

    /// Number of buffered changes.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl<K, V> ResourceParticipant for MapWriter<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> ParticipantResult {
        Ok(())
    }

    fn commit(&self) -> ParticipantResult {
        let changes = std::mem::take(&mut *self.pending.lock());
        let count = changes.len();
        let mut committed = self.committed.write();
        for change in changes {
            match change {
                Change::Put(key, value) => {
                    committed.insert(key, value);
                }
                Change::Remove(key) => {
                    committed.remove(&key);
                }
            }
        }
        tracing::debug!(participant = %self.name, changes = count, "map changes applied");
        Ok(())
    }

    fn rollback(&self) -> ParticipantResult {
        self.pending.lock().clear();
        Ok(())
    }
}

impl<K, V> fmt::Debug for MapWriter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapWriter")
            .field("name", &self.name)
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}
