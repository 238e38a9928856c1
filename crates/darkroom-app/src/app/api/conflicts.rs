//! Manager review of deferred booking edits.

use salvo::prelude::Json;
use salvo::{Depot, Request, Router, handler};

use darkroom_db::model::booking::Booking;
use darkroom_db::model::conflict::{BookingConflict, ConflictStatus};
use darkroom_service::conflict;

use super::CONFLICT_ROUTE_COMPONENT;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::get_actor_from_depot;
use crate::studio_handler::get_studio_from_depot;

/// `None` means every status.
fn parse_status(raw: Option<&str>) -> AppResult<Option<ConflictStatus>> {
    match raw {
        None | Some("pending") => Ok(Some(ConflictStatus::Pending)),
        Some("accepted") => Ok(Some(ConflictStatus::Accepted)),
        Some("rejected") => Ok(Some(ConflictStatus::Rejected)),
        Some("all") => Ok(None),
        Some(other) => Err(AppError::BadRequest(format!(
            "unknown conflict status '{other}'"
        ))),
    }
}

fn conflict_id(req: &Request) -> AppResult<String> {
    req.param::<String>("id")
        .ok_or_else(|| AppError::BadRequest("missing conflict id".to_string()))
}

/// ## Summary
/// GET /api/conflicts?status=pending|accepted|rejected|all
///
/// Defaults to pending conflicts, newest first.
#[handler]
async fn list(req: &mut Request, depot: &Depot) -> AppResult<Json<Vec<BookingConflict>>> {
    let status = parse_status(req.query::<String>("status").as_deref())?;
    let studio = get_studio_from_depot(depot)?;
    Ok(Json(conflict::list_conflicts(&studio, status).await))
}

/// ## Summary
/// POST /api/conflicts/{id}/accept - applies the proposal and returns the booking.
///
/// ## Errors
/// 403 below manager rank, 404 for an unknown conflict, 409 once resolved.
#[handler]
async fn accept(req: &mut Request, depot: &Depot) -> AppResult<Json<Booking>> {
    let id = conflict_id(req)?;
    let actor = get_actor_from_depot(depot)?;
    let studio = get_studio_from_depot(depot)?;
    Ok(Json(conflict::accept_conflict(&studio, &actor, &id).await?))
}

/// ## Summary
/// POST /api/conflicts/{id}/reject
///
/// ## Errors
/// 403 below manager rank, 404 for an unknown conflict, 409 once resolved.
#[handler]
async fn reject(req: &mut Request, depot: &Depot) -> AppResult<Json<BookingConflict>> {
    let id = conflict_id(req)?;
    let actor = get_actor_from_depot(depot)?;
    let studio = get_studio_from_depot(depot)?;
    Ok(Json(conflict::reject_conflict(&studio, &actor, &id).await?))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(CONFLICT_ROUTE_COMPONENT).get(list).push(
        Router::with_path("{id}")
            .push(Router::with_path("accept").post(accept))
            .push(Router::with_path("reject").post(reject)),
    )
}
