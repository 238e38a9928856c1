use async_trait::async_trait;
use darkroom_db::model::CloudRow;

use crate::cloud::{CloudError, CloudResult, CloudStore};

/// Cloud stand-in used when no cloud is configured. Every call is unreachable,
/// so writes queue and reads serve local data.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineCloud;

fn no_cloud<T>() -> CloudResult<T> {
    Err(CloudError::Unreachable("no cloud configured".to_string()))
}

#[async_trait]
impl CloudStore for OfflineCloud {
    async fn fetch_all(&self, _table: &str) -> CloudResult<Vec<CloudRow>> {
        no_cloud()
    }

    async fn fetch_one(&self, _table: &str, _id: &str) -> CloudResult<Option<CloudRow>> {
        no_cloud()
    }

    async fn upsert(&self, _table: &str, _row: &CloudRow) -> CloudResult<()> {
        no_cloud()
    }

    async fn update(&self, _table: &str, _id: &str, _patch: &CloudRow) -> CloudResult<u64> {
        no_cloud()
    }

    async fn delete(&self, _table: &str, _id: &str) -> CloudResult<u64> {
        no_cloud()
    }

    async fn ping(&self) -> CloudResult<()> {
        no_cloud()
    }
}
