//! Outbound synchronisation: the durable queue, dual writes and the drain.

pub mod drain;
pub mod queue;
pub mod write;

pub use drain::DrainReport;

use crate::error::ServiceResult;
use crate::studio::Studio;

impl Studio {
    /// ## Summary
    /// Manual sync trigger: runs a drain pass now.
    ///
    /// ## Errors
    /// Returns an error if the queue cannot be read.
    pub async fn sync_now(&self) -> ServiceResult<DrainReport> {
        drain::drain(self).await
    }
}
