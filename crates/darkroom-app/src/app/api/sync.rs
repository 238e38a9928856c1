//! Queue status, manual drain and dead-letter handling.

use salvo::prelude::Json;
use salvo::{Depot, Request, Router, handler};

use darkroom_core::actor::Rank;
use darkroom_db::model::queue::{QueueStatus, SyncQueueEntry};
use darkroom_service::sync::DrainReport;
use darkroom_service::sync::queue::{self, QueueSummary};

use super::SYNC_ROUTE_COMPONENT;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::get_actor_from_depot;
use crate::studio_handler::get_studio_from_depot;

/// ## Summary
/// GET /api/sync - pending and dead counts plus the online flag.
#[handler]
async fn status(depot: &Depot) -> AppResult<Json<QueueSummary>> {
    let studio = get_studio_from_depot(depot)?;
    let summary = queue::summary(&studio.store, studio.is_online()).await?;
    Ok(Json(summary))
}

/// ## Summary
/// POST /api/sync - runs a drain pass now.
#[handler]
async fn drain_now(depot: &Depot) -> AppResult<Json<DrainReport>> {
    let studio = get_studio_from_depot(depot)?;
    let actor = get_actor_from_depot(depot)?;
    tracing::info!(actor = %actor.id, "Manual sync requested");
    Ok(Json(studio.sync_now().await?))
}

/// ## Summary
/// GET /api/sync/dead - entries parked after permanent failure.
#[handler]
async fn dead_entries(depot: &Depot) -> AppResult<Json<Vec<SyncQueueEntry>>> {
    let studio = get_studio_from_depot(depot)?;
    Ok(Json(queue::entries(&studio.store, QueueStatus::Dead).await?))
}

/// ## Summary
/// POST /api/sync/dead/{id}/requeue - puts a dead entry back in line.
///
/// ## Errors
/// 403 below manager rank, 400 for a malformed id, 404 when no dead entry has it.
#[handler]
async fn requeue(req: &mut Request, depot: &Depot) -> AppResult<Json<QueueSummary>> {
    let actor = get_actor_from_depot(depot)?;
    actor.require(Rank::Manager, "requeue dead sync entries")?;
    let id = req
        .param::<i64>("id")
        .ok_or_else(|| AppError::BadRequest("queue entry id must be an integer".to_string()))?;

    let studio = get_studio_from_depot(depot)?;
    queue::requeue(&studio.store, id).await?;
    tracing::info!(actor = %actor.id, id, "Dead entry requeued");
    Ok(Json(queue::summary(&studio.store, studio.is_online()).await?))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(SYNC_ROUTE_COMPONENT)
        .get(status)
        .post(drain_now)
        .push(
            Router::with_path("dead")
                .get(dead_entries)
                .push(Router::with_path("{id}/requeue").post(requeue)),
        )
}
