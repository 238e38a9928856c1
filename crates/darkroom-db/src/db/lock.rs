//! Per-row async mutexes serialising read-modify-write sequences on the same row.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

type Registry = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Keyed registry of row locks. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct RowLocks {
    inner: Arc<Mutex<Registry>>,
}

/// Held lock on one `(table, id)`. Released on drop.
#[derive(Debug)]
pub struct RowGuard {
    key: String,
    registry: Arc<Mutex<Registry>>,
    _guard: OwnedMutexGuard<()>,
}

impl RowLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Waits for exclusive access to the row identified by `table` and `id`.
    pub async fn lock(&self, table: &str, id: &str) -> RowGuard {
        let key = format!("{table}/{id}");
        let mutex = {
            let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(registry.entry(key.clone()).or_default())
        };
        let guard = mutex.lock_owned().await;
        RowGuard {
            key,
            registry: Arc::clone(&self.inner),
            _guard: guard,
        }
    }

    /// Number of rows with a live lock entry.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        // Registry entry plus this guard: nobody else is waiting.
        let idle = registry
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) <= 2);
        if idle {
            registry.remove(&self.key);
        }
    }
}
