//! Shared handles every service call runs against.

use std::sync::Arc;
use std::time::Duration;

use darkroom_core::config::{RetentionConfig, Settings, SyncConfig};
use darkroom_db::db::connection::open_local_store;
use darkroom_db::db::store::LocalStore;
use tokio::sync::Mutex;

use crate::cloud::{CloudStore, open_cloud};
use crate::connectivity::Connectivity;
use crate::notify::Notifier;

/// The studio's data context: local store, cloud mirror and the state that
/// coordinates them. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct Studio {
    pub store: LocalStore,
    pub cloud: Arc<dyn CloudStore>,
    pub connectivity: Connectivity,
    pub notifier: Notifier,
    settings: Arc<Settings>,
    /// Held for the duration of a drain pass.
    pub(crate) drain_gate: Arc<Mutex<()>>,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("store", &self.store)
            .field("online", &self.connectivity.is_online())
            .finish_non_exhaustive()
    }
}

impl Studio {
    /// ## Summary
    /// Assembles a studio from already opened stores. Starts offline until
    /// the first health probe succeeds.
    #[must_use]
    pub fn new(store: LocalStore, cloud: Arc<dyn CloudStore>, settings: Settings) -> Self {
        Self {
            store,
            cloud,
            connectivity: Connectivity::new(false),
            notifier: Notifier::new(settings.notifications.capacity),
            settings: Arc::new(settings),
            drain_gate: Arc::new(Mutex::new(())),
        }
    }

    /// ## Summary
    /// Opens the local store and cloud client described by `settings` and
    /// probes the cloud once.
    ///
    /// ## Errors
    /// Returns an error if the local store cannot be opened or migrated, or
    /// the cloud configuration is malformed. An unreachable cloud is not an error.
    pub async fn open(settings: Settings) -> anyhow::Result<Self> {
        let store = open_local_store(&settings.local).await?;
        let cloud = open_cloud(&settings.cloud)?;
        let studio = Self::new(store, cloud, settings);
        studio.probe().await;
        Ok(studio)
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn sync_config(&self) -> &SyncConfig {
        &self.settings.sync
    }

    #[must_use]
    pub fn retention(&self) -> &RetentionConfig {
        &self.settings.retention
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Upper bound for one cloud read or write.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.settings.cloud.request_timeout()
    }

    /// ## Summary
    /// Pings the cloud under the health timeout and updates the online flag.
    pub async fn probe(&self) -> bool {
        self.connectivity
            .probe(self.cloud.as_ref(), self.settings.cloud.health_timeout())
            .await
    }
}
