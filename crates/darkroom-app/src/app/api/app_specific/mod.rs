use salvo::Router;

use crate::middleware::auth::AuthMiddleware;

mod healthcheck;
mod whoami;

#[must_use]
pub fn routes() -> Router {
    Router::with_path("app")
        .push(healthcheck::routes())
        .push(whoami::routes().hoop(AuthMiddleware))
}
