/// Per-document write locks.
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Registry handing out one exclusive lock per document id.
///
/// Writers hold exactly one document lock at a time, so lock order never
/// matters. Readers don't take these locks.
#[derive(Debug, Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `doc_id`, creating it on first use.
    ///
    /// Keep the returned handle alive for as long as its guard is held.
    pub fn handle(&self, doc_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(doc_id) {
            return Arc::clone(lock);
        }
        let lock = Arc::new(Mutex::new(()));
        locks.insert(doc_id.to_string(), Arc::clone(&lock));
        lock
    }

    /// Drops registry entries no writer currently holds.
    pub fn prune(&self) {
        self.locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of documents with a registered lock.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
