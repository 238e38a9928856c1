//! Cloud relational store: the secondary, eventually consistent mirror.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use darkroom_core::config::CloudConfig;
use darkroom_db::model::CloudRow;
use thiserror::Error;

#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;
pub mod offline;
pub mod rest;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    #[error("Cloud unreachable: {0}")]
    Unreachable(String),

    #[error("Cloud request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cloud rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Cloud response could not be decoded: {0}")]
    Decode(String),

    /// The outbound row itself is unusable; retrying cannot help.
    #[error("Invalid outbound payload: {0}")]
    InvalidPayload(String),
}

impl CloudError {
    /// ## Summary
    /// Whether retrying later may succeed. Client-side rejections other than
    /// request timeout and rate limiting are permanent.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => {
                !(*status >= 400 && *status < 500) || *status == 408 || *status == 429
            }
            Self::Unreachable(_) | Self::Timeout(_) | Self::Decode(_) => true,
            Self::InvalidPayload(_) => false,
        }
    }

    /// Whether the failure says the cloud itself could not be reached.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_))
    }
}

pub type CloudResult<T> = std::result::Result<T, CloudError>;

/// Table-level operations against the cloud store. Tables and ids are the
/// same on both sides; rows use the cloud's snake_case columns.
#[async_trait]
pub trait CloudStore: Send + Sync {
    async fn fetch_all(&self, table: &str) -> CloudResult<Vec<CloudRow>>;

    async fn fetch_one(&self, table: &str, id: &str) -> CloudResult<Option<CloudRow>>;

    /// Insert, or merge into the existing row with the same id.
    async fn upsert(&self, table: &str, row: &CloudRow) -> CloudResult<()>;

    /// Returns the number of rows changed; zero when the row does not exist.
    async fn update(&self, table: &str, id: &str, patch: &CloudRow) -> CloudResult<u64>;

    /// Returns the number of rows removed; zero when the row does not exist.
    async fn delete(&self, table: &str, id: &str) -> CloudResult<u64>;

    async fn ping(&self) -> CloudResult<()>;
}

/// ## Summary
/// Races a cloud call against `limit`; running out of time is a transient failure.
///
/// ## Errors
/// Returns `Timeout` when the call does not finish in time, otherwise the call's own result.
pub async fn timed<T, F>(limit: Duration, call: F) -> CloudResult<T>
where
    F: Future<Output = CloudResult<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_elapsed| CloudError::Timeout(limit))?
}

/// ## Summary
/// Builds the cloud client from configuration. Without a URL the studio runs offline.
///
/// ## Errors
/// Returns an error if the URL is malformed or the HTTP client cannot be built.
pub fn open_cloud(config: &CloudConfig) -> anyhow::Result<Arc<dyn CloudStore>> {
    match config.url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            let cloud = rest::RestCloud::new(url, config.api_key.clone(), config.request_timeout())?;
            tracing::info!(url, "Cloud mirror configured");
            Ok(Arc::new(cloud))
        }
        _ => {
            tracing::info!("No cloud URL configured; running local-only");
            Ok(Arc::new(offline::OfflineCloud))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CloudError::Unreachable("dns".to_string()).is_transient());
        assert!(CloudError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(
            CloudError::Rejected {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            CloudError::Rejected {
                status: 429,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !CloudError::Rejected {
                status: 422,
                body: String::new()
            }
            .is_transient()
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_timed_reports_timeout() {
        let limit = Duration::from_millis(10);
        let result: CloudResult<()> = timed(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(result, Err(CloudError::Timeout(limit)));
    }
}
