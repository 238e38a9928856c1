//! Shared view of whether the cloud is reachable.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::cloud::{CloudStore, timed};

/// Online flag shared across services. Cloning shares the flag.
#[derive(Debug, Clone)]
pub struct Connectivity {
    state: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (state, _rx) = watch::channel(online);
        Self {
            state: Arc::new(state),
        }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// ## Summary
    /// Records the current reachability. Returns `true` when this call brought
    /// the studio back online.
    pub fn set_online(&self, online: bool) -> bool {
        let mut reconnected = false;
        self.state.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            reconnected = online;
            *current = online;
            true
        });
        if reconnected {
            tracing::info!("Cloud reachable again");
        } else if !online {
            tracing::debug!("Cloud marked unreachable");
        }
        reconnected
    }

    /// Receiver that observes every change of the flag.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// ## Summary
    /// Pings the cloud under `limit` and records the outcome.
    ///
    /// ## Side Effects
    /// Publishes a change to subscribers when reachability flips.
    #[tracing::instrument(skip(self, cloud))]
    pub async fn probe(&self, cloud: &dyn CloudStore, limit: Duration) -> bool {
        let online = match timed(limit, cloud.ping()).await {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "Health check failed");
                false
            }
        };
        self.set_online(online);
        online
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::memory::MemoryCloud;

    #[test_log::test(tokio::test)]
    async fn test_reconnect_is_published_once() {
        let connectivity = Connectivity::new(false);
        let mut rx = connectivity.subscribe();

        assert!(connectivity.set_online(true));
        assert!(!connectivity.set_online(true));
        assert!(rx.has_changed().expect("sender alive"));
        assert!(*rx.borrow_and_update());
    }

    #[test_log::test(tokio::test)]
    async fn test_probe_tracks_cloud() {
        let cloud = MemoryCloud::new();
        let connectivity = Connectivity::new(true);

        cloud.set_online(false);
        assert!(!connectivity.probe(&cloud, Duration::from_secs(1)).await);
        assert!(!connectivity.is_online());

        cloud.set_online(true);
        assert!(connectivity.probe(&cloud, Duration::from_secs(1)).await);
    }
}
