use salvo::{Router, handler};

/// Liveness only; the cloud's reachability is reported by `GET /api/sync`.
#[handler]
async fn healthcheck() -> &'static str {
    "OK"
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("healthcheck").get(healthcheck)
}
