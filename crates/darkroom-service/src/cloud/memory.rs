//! In-memory cloud double with an online switch, injected failures and a call log.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use darkroom_db::model::CloudRow;
use darkroom_db::model::cloud::cloud_id;

use crate::cloud::{CloudError, CloudResult, CloudStore};

/// A recorded mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudCall {
    pub op: &'static str,
    pub table: String,
    pub id: String,
}

#[derive(Debug)]
pub struct MemoryCloud {
    online: AtomicBool,
    tables: Mutex<HashMap<String, BTreeMap<String, CloudRow>>>,
    failures: Mutex<VecDeque<CloudError>>,
    calls: Mutex<Vec<CloudCall>>,
}

impl Default for MemoryCloud {
    fn default() -> Self {
        Self::new()
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryCloud {
    #[must_use]
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            tables: Mutex::default(),
            failures: Mutex::default(),
            calls: Mutex::default(),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Makes the next call fail with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, err: CloudError) {
        guard(&self.failures).push_back(err);
    }

    /// Mutating calls in the order they were applied.
    #[must_use]
    pub fn calls(&self) -> Vec<CloudCall> {
        guard(&self.calls).clone()
    }

    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<CloudRow> {
        guard(&self.tables)
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn row(&self, table: &str, id: &str) -> Option<CloudRow> {
        guard(&self.tables).get(table)?.get(id).cloned()
    }

    /// Places a row directly, bypassing the call log.
    pub fn seed(&self, table: &str, row: CloudRow) {
        if let Some(id) = cloud_id(&row) {
            guard(&self.tables)
                .entry(table.to_string())
                .or_default()
                .insert(id, row);
        }
    }

    /// Removes a row directly, bypassing the call log.
    pub fn remove(&self, table: &str, id: &str) {
        if let Some(rows) = guard(&self.tables).get_mut(table) {
            rows.remove(id);
        }
    }

    fn gate(&self) -> CloudResult<()> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(CloudError::Unreachable("memory cloud is offline".to_string()));
        }
        guard(&self.failures).pop_front().map_or(Ok(()), Err)
    }

    fn record(&self, op: &'static str, table: &str, id: &str) {
        guard(&self.calls).push(CloudCall {
            op,
            table: table.to_string(),
            id: id.to_string(),
        });
    }
}

#[async_trait]
impl CloudStore for MemoryCloud {
    async fn fetch_all(&self, table: &str) -> CloudResult<Vec<CloudRow>> {
        self.gate()?;
        Ok(self.rows(table))
    }

    async fn fetch_one(&self, table: &str, id: &str) -> CloudResult<Option<CloudRow>> {
        self.gate()?;
        Ok(self.row(table, id))
    }

    async fn upsert(&self, table: &str, row: &CloudRow) -> CloudResult<()> {
        self.gate()?;
        let id = cloud_id(row).ok_or_else(|| CloudError::Rejected {
            status: 400,
            body: "row has no id".to_string(),
        })?;
        self.record("upsert", table, &id);

        let mut tables = guard(&self.tables);
        let rows = tables.entry(table.to_string()).or_default();
        match rows.get_mut(&id) {
            Some(existing) => existing.extend(row.clone()),
            None => {
                rows.insert(id, row.clone());
            }
        }
        Ok(())
    }

    async fn update(&self, table: &str, id: &str, patch: &CloudRow) -> CloudResult<u64> {
        self.gate()?;
        self.record("update", table, id);

        let mut tables = guard(&self.tables);
        match tables.get_mut(table).and_then(|rows| rows.get_mut(id)) {
            Some(existing) => {
                existing.extend(patch.clone());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, table: &str, id: &str) -> CloudResult<u64> {
        self.gate()?;
        self.record("delete", table, id);

        let removed = guard(&self.tables)
            .get_mut(table)
            .and_then(|rows| rows.remove(id));
        Ok(u64::from(removed.is_some()))
    }

    async fn ping(&self) -> CloudResult<()> {
        self.gate()
    }
}
