use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::db::LocalBridge;
use crate::db::wire::{BridgeOutput, Statement};
use crate::error::DbResult;

/// Bridge used when no privileged endpoint is available. Every statement
/// succeeds with no rows and nothing affected.
#[derive(Debug, Default)]
pub struct DetachedBridge {
    warned: AtomicBool,
}

impl DetachedBridge {
    fn note(&self, sql: &str) {
        if !self.warned.swap(true, Ordering::Relaxed) {
            tracing::warn!(sql, "Local store has no endpoint; statement ignored");
        }
    }
}

#[async_trait]
impl LocalBridge for DetachedBridge {
    async fn run(&self, statement: Statement) -> DbResult<BridgeOutput> {
        self.note(&statement.sql);
        Ok(BridgeOutput::default())
    }

    async fn run_atomic(&self, statements: Vec<Statement>) -> DbResult<Vec<BridgeOutput>> {
        if let Some(first) = statements.first() {
            self.note(&first.sql);
        }
        Ok(vec![BridgeOutput::default(); statements.len()])
    }

    fn is_detached(&self) -> bool {
        true
    }
}
