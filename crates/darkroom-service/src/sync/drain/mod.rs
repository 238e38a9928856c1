//! Flushes the outbound queue to the cloud.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use darkroom_core::types::{EntityKind, SyncOperation};
use darkroom_db::model::queue::{QueueStatus, SyncQueueEntry};
use futures::StreamExt;
use serde::Serialize;

use crate::cloud::timed;
use crate::error::ServiceResult;
use crate::studio::Studio;
use crate::sync::queue;
use crate::sync::write::apply;

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    /// Another pass was already running; nothing was attempted.
    pub skipped: bool,
    /// The cloud was unreachable; nothing was attempted.
    pub offline: bool,
    pub applied: usize,
    /// Updates and deletes whose row was already gone from the cloud.
    pub already_satisfied: usize,
    pub failed: usize,
    pub dead: usize,
    /// Pending entries left for a later pass (backing off, or behind a
    /// failure or a dead entry of the same entity).
    pub deferred: usize,
}

impl DrainReport {
    fn merge(&mut self, other: &Self) {
        self.applied += other.applied;
        self.already_satisfied += other.already_satisfied;
        self.failed += other.failed;
        self.dead += other.dead;
        self.deferred += other.deferred;
    }
}

type Group = Vec<SyncQueueEntry>;

/// ## Summary
/// Groups queued entries per entity, keeping sequence order inside each group.
fn group_by_entity(entries: Vec<SyncQueueEntry>) -> Vec<Group> {
    let mut groups: BTreeMap<(EntityKind, String), Group> = BTreeMap::new();
    for entry in entries {
        groups
            .entry((entry.entity_type, entry.entity_id.clone()))
            .or_default()
            .push(entry);
    }
    groups.into_values().collect()
}

/// ## Summary
/// Runs one drain pass. At most one pass runs at a time; a concurrent call
/// returns a report with `skipped` set. Entities drain in parallel, each
/// entity's entries strictly in enqueue order, stopping at the first failure
/// or dead entry. Dead entries stay put until requeued.
///
/// ## Side Effects
/// - Writes to the cloud
/// - Removes applied entries, reschedules or parks failed ones
/// - Probes the cloud first when the studio believes it is offline
///
/// ## Errors
/// Returns an error if the queue cannot be read.
#[tracing::instrument(skip(studio))]
pub async fn drain(studio: &Studio) -> ServiceResult<DrainReport> {
    let Ok(_pass) = studio.drain_gate.try_lock() else {
        tracing::debug!("Drain already running");
        return Ok(DrainReport {
            skipped: true,
            ..DrainReport::default()
        });
    };

    if !studio.is_online() && !studio.probe().await {
        return Ok(DrainReport {
            offline: true,
            ..DrainReport::default()
        });
    }

    let queued = queue::all_entries(&studio.store).await?;
    if queued.iter().all(|entry| entry.status == QueueStatus::Dead) {
        return Ok(DrainReport::default());
    }

    let now = Utc::now();
    let groups: Vec<Group> = group_by_entity(queued)
        .into_iter()
        .filter(|group| has_pending(group))
        .collect();
    tracing::debug!(entities = groups.len(), "Draining outbound queue");

    let concurrency = studio.sync_config().drain_concurrency.max(1);
    let reports: Vec<DrainReport> = futures::stream::iter(groups)
        .map(|group| drain_group(studio, group, now))
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut report = DrainReport::default();
    for group in &reports {
        report.merge(group);
    }
    tracing::info!(
        applied = report.applied,
        already_satisfied = report.already_satisfied,
        failed = report.failed,
        dead = report.dead,
        deferred = report.deferred,
        "Drain pass finished"
    );
    Ok(report)
}

fn has_pending(entries: &[SyncQueueEntry]) -> bool {
    entries.iter().any(|entry| entry.status == QueueStatus::Pending)
}

fn pending_count(entries: &[SyncQueueEntry]) -> usize {
    entries
        .iter()
        .filter(|entry| entry.status == QueueStatus::Pending)
        .count()
}

async fn drain_group(studio: &Studio, group: Group, now: DateTime<Utc>) -> DrainReport {
    let mut report = DrainReport::default();

    for (position, entry) in group.iter().enumerate() {
        if entry.status == QueueStatus::Dead {
            let waiting = pending_count(&group[position..]);
            if waiting > 0 {
                tracing::debug!(id = entry.id, waiting, "Entity held behind a dead entry");
            }
            report.deferred += waiting;
            break;
        }
        if !entry.is_due(now) {
            report.deferred += pending_count(&group[position..]);
            break;
        }

        let attempt = timed(
            studio.request_timeout(),
            apply(
                studio.cloud.as_ref(),
                entry.entity_type,
                &entry.entity_id,
                entry.operation,
                &entry.payload,
            ),
        )
        .await;

        let outcome = match attempt {
            Ok(affected) => {
                if affected == 0 && entry.operation != SyncOperation::Create {
                    tracing::debug!(id = entry.id, "Cloud row already gone; entry satisfied");
                    report.already_satisfied += 1;
                } else {
                    report.applied += 1;
                }
                queue::complete(&studio.store, entry.id).await.map(|()| true)
            }
            Err(err) => {
                if err.is_connectivity() {
                    studio.connectivity.set_online(false);
                }
                queue::record_failure(&studio.store, studio.sync_config(), entry, &err)
                    .await
                    .map(|status| {
                        match status {
                            QueueStatus::Dead => report.dead += 1,
                            QueueStatus::Pending => report.failed += 1,
                        }
                        false
                    })
            }
        };

        match outcome {
            Ok(true) => {}
            Ok(false) => {
                report.deferred += pending_count(&group[position + 1..]);
                break;
            }
            Err(err) => {
                tracing::warn!(id = entry.id, error = %err, "Local queue update failed; stopping entity");
                report.deferred += pending_count(&group[position + 1..]);
                break;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests;
