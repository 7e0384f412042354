use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Entry = Arc<AsyncMutex<()>>;

/// Per-file async mutexes.
///
/// Serializes read-modify-write of a single file's metadata while letting
///  different files proceed in parallel. Entries are dropped again once
///  nobody holds or waits on them.
#[derive(Debug, Clone, Default)]
pub struct NameLocks {
    inner: Arc<parking_lot::Mutex<HashMap<String, Entry>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`.
    pub async fn lock(&self, name: &str) -> NameGuard {
        let entry = {
            let mut map = self.inner.lock();
            map.entry(name.to_string()).or_default().clone()
        };
        let guard = entry.clone().lock_owned().await;
        NameGuard {
            locks: self.clone(),
            name: name.to_string(),
            entry,
            guard: Some(guard),
        }
    }

    /// Number of names currently tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held for the duration of a critical section on one name.
#[derive(Debug)]
pub struct NameGuard {
    locks: NameLocks,
    name: String,
    entry: Entry,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        // the owned guard holds its own reference to the entry
        drop(self.guard.take());

        let mut map = self.locks.inner.lock();
        // one reference in the map, one here: no one else is waiting
        if Arc::strong_count(&self.entry) == 2 {
            map.remove(&self.name);
        }
    }
}
