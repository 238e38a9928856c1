use salvo::prelude::Json;
use salvo::{Depot, Router, handler};

use darkroom_core::actor::Rank;
use darkroom_service::lifecycle::{self, SweepReport};

use crate::error::AppResult;
use crate::middleware::auth::get_actor_from_depot;
use crate::studio_handler::get_studio_from_depot;

/// ## Summary
/// POST /api/maintenance/sweep - purges trash older than the retention window
/// now instead of waiting for the background sweep.
///
/// ## Errors
/// 403 below manager rank.
#[handler]
async fn sweep(depot: &Depot) -> AppResult<Json<SweepReport>> {
    let actor = get_actor_from_depot(depot)?;
    actor.require(Rank::Manager, "run the retention sweep")?;
    let studio = get_studio_from_depot(depot)?;
    let report = lifecycle::sweep_expired(&studio).await?;
    tracing::info!(actor = %actor.id, purged = report.purged.len(), "Manual retention sweep");
    Ok(Json(report))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("maintenance").push(Router::with_path("sweep").post(sweep))
}

#[cfg(test)]
mod tests {
    use salvo::http::StatusCode;
    use serde_json::{Value, json};

    use crate::app::api::test_support::{TestRequest, test_service};

    #[test_log::test(tokio::test)]
    async fn test_sweep_with_empty_trash() {
        let (service, _studio, _cloud) = test_service().await;
        let report: Value = TestRequest::post("/api/maintenance/sweep")
            .send(&service)
            .await
            .assert_status(StatusCode::OK)
            .json();
        assert_eq!(report["purged"], json!([]));
        assert_eq!(report["failed"], json!(0));
    }
}
