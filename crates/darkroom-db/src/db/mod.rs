use async_trait::async_trait;

use crate::db::wire::{BridgeOutput, Statement};
use crate::error::DbResult;

pub mod connection;
pub mod detached;
pub mod endpoint;
pub mod lock;
pub mod map;
pub mod query;
pub mod schema;
pub mod store;
pub mod stream;
pub mod transaction;
pub mod wire;

/// Unprivileged side of the local store. Sends compiled SQL across the
/// process boundary and receives rows back.
#[async_trait]
pub trait LocalBridge: Send + Sync {
    /// ## Summary
    /// Runs one statement.
    ///
    /// ## Errors
    /// Returns an error if the endpoint rejects the statement or the bridge is closed.
    async fn run(&self, statement: Statement) -> DbResult<BridgeOutput>;

    /// ## Summary
    /// Runs the statements inside one transaction. Either all apply or none do.
    ///
    /// ## Errors
    /// Returns the first statement error; earlier statements are rolled back.
    async fn run_atomic(&self, statements: Vec<Statement>) -> DbResult<Vec<BridgeOutput>>;

    /// Whether statements are dropped instead of reaching a database.
    fn is_detached(&self) -> bool {
        false
    }
}
