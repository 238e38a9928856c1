use salvo::prelude::Json;
use salvo::{Depot, Router, handler};

use darkroom_core::actor::Actor;

use crate::error::AppResult;
use crate::middleware::auth::get_actor_from_depot;

/// ## Summary
/// Returns the acting user as resolved by the `AuthMiddleware`.
#[handler]
async fn whoami(depot: &Depot) -> AppResult<Json<Actor>> {
    Ok(Json(get_actor_from_depot(depot)?))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("whoami").get(whoami)
}
