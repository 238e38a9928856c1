mod app_specific;
mod conflicts;
mod maintenance;
mod sync;

use salvo::Router;

use crate::middleware::auth::AuthMiddleware;

pub use darkroom_core::constants::{
    API_ROUTE_COMPONENT, API_ROUTE_PREFIX, CONFLICT_ROUTE_COMPONENT, CONFLICT_ROUTE_PREFIX,
    SYNC_ROUTE_COMPONENT, SYNC_ROUTE_PREFIX,
};

/// ## Summary
/// Constructs the operator API router. Everything except the health check
/// runs behind [`AuthMiddleware`].
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .push(app_specific::routes())
        .push(
            Router::new()
                .hoop(AuthMiddleware)
                .push(sync::routes())
                .push(conflicts::routes())
                .push(maintenance::routes()),
        )
}

#[cfg(test)]
pub(crate) mod test_support;
