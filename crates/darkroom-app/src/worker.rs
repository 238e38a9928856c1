//! Background loops that keep the local store and the cloud converging.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use darkroom_service::Studio;
use darkroom_service::lifecycle::sweep_expired;

fn every(secs: u64) -> tokio::time::Interval {
    let mut ticker = interval(Duration::from_secs(secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn drain_pass(studio: &Studio, trigger: &'static str) {
    match studio.sync_now().await {
        Ok(report) if report.applied + report.failed + report.dead > 0 => {
            tracing::info!(trigger, ?report, "Drain pass finished");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(trigger, error = %err, "Drain pass failed"),
    }
}

/// Handles to the spawned loops. Dropping this does not stop them; call
/// [`Workers::abort`] on shutdown.
#[derive(Debug)]
pub struct Workers {
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    /// ## Summary
    /// Starts the periodic drain, the health probe, the reconnect watcher and
    /// the retention sweep.
    #[must_use]
    pub fn spawn(studio: &Studio) -> Self {
        let handles = vec![
            tokio::spawn(drain_loop(studio.clone())),
            tokio::spawn(health_loop(studio.clone())),
            tokio::spawn(reconnect_loop(
                studio.clone(),
                studio.connectivity.subscribe(),
            )),
            tokio::spawn(sweep_loop(studio.clone())),
        ];
        tracing::debug!(count = handles.len(), "Background workers started");
        Self { handles }
    }

    pub fn abort(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

async fn drain_loop(studio: Studio) {
    let mut ticker = every(studio.sync_config().drain_interval_secs);
    loop {
        ticker.tick().await;
        if studio.is_online() {
            drain_pass(&studio, "interval").await;
        }
    }
}

async fn health_loop(studio: Studio) {
    let mut ticker = every(studio.sync_config().health_interval_secs);
    loop {
        ticker.tick().await;
        studio.probe().await;
    }
}

/// Drains as soon as the studio comes back online. The receiver is taken
/// before the health loop starts so the first flip is not missed.
async fn reconnect_loop(studio: Studio, mut online: watch::Receiver<bool>) {
    while online.changed().await.is_ok() {
        let now_online = *online.borrow_and_update();
        if now_online {
            drain_pass(&studio, "reconnect").await;
        }
    }
}

async fn sweep_loop(studio: Studio) {
    let mut ticker = every(studio.retention().sweep_interval_secs);
    loop {
        ticker.tick().await;
        match sweep_expired(&studio).await {
            Ok(report) if !report.purged.is_empty() || report.failed > 0 => {
                tracing::info!(
                    purged = report.purged.len(),
                    failed = report.failed,
                    "Retention sweep finished"
                );
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "Retention sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use darkroom_core::types::{EntityKind, SyncOperation};
    use darkroom_service::sync::queue;
    use darkroom_service::testing::memory_studio;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_reconnect_drains_pending_writes() {
        let (studio, cloud) = memory_studio().await.expect("studio");
        studio.connectivity.set_online(false);
        queue::enqueue(
            &studio.store,
            EntityKind::Reminder,
            "r-offline",
            SyncOperation::Create,
            json!({"id": "r-offline", "title": "Print album"}),
        )
        .await
        .expect("enqueue");

        let workers = Workers::spawn(&studio);
        let mirrored = tokio::time::timeout(Duration::from_secs(5), async {
            while cloud.row("reminders", "r-offline").is_none() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        workers.abort();

        assert!(mirrored.is_ok(), "pending write never reached the cloud");
        assert!(studio.is_online());
    }
}
