use salvo::Depot;
use salvo::http::HeaderMap;
use tracing::error;

use darkroom_core::actor::{Actor, Role};
use darkroom_core::config::{AuthMethod, Settings};

use crate::config::settings_from_depot;
use crate::error::{AppError, AppResult};

pub mod depot_keys {
    pub const ACTOR: &str = "darkroom.actor";
}

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// ## Summary
/// Resolves the acting user for a request according to `auth.method`.
///
/// ## Errors
/// - `NotAuthenticated` when proxy headers are missing
/// - `BadRequest` for an unknown role
/// - `ServiceError(InvalidConfiguration)` when single-user mode has no operator configured
pub fn resolve_actor(headers: &HeaderMap, settings: &Settings) -> AppResult<Actor> {
    match settings.auth.method {
        AuthMethod::SingleUser => {
            let operator = settings.auth.single_user.as_ref().ok_or_else(|| {
                darkroom_service::error::ServiceError::InvalidConfiguration(
                    "auth.single_user is required for single_user auth".to_string(),
                )
            })?;
            Ok(Actor::new(
                operator.id.clone(),
                operator.name.clone(),
                operator.role,
            ))
        }
        AuthMethod::Proxy => {
            let (Some(id), Some(role)) = (
                header(headers, ACTOR_ID_HEADER),
                header(headers, ACTOR_ROLE_HEADER),
            ) else {
                return Err(AppError::NotAuthenticated);
            };
            let role = Role::parse(role).map_err(|err| AppError::BadRequest(err.to_string()))?;
            let name = header(headers, ACTOR_NAME_HEADER).unwrap_or(id);
            Ok(Actor::new(id, name, role))
        }
    }
}

/// ## Summary
/// Authentication middleware that resolves the acting user and stores it in the depot.
///
/// ## Side Effects
/// Inserts the actor into the depot under [`depot_keys::ACTOR`] for downstream handlers.
///
/// ## Errors
/// Renders 401 without proxy headers, 400 for an unknown role and 500 when
/// configuration is missing.
#[salvo::async_trait]
impl salvo::Handler for AuthMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        tracing::trace!("Resolving actor");

        let resolved = settings_from_depot(depot)
            .and_then(|settings| resolve_actor(req.headers(), &settings));
        match resolved {
            Ok(actor) => {
                tracing::debug!(actor = %actor.id, role = %actor.role, "Actor resolved");
                depot.insert(depot_keys::ACTOR, actor);
            }
            Err(err) => {
                if matches!(err, AppError::NotAuthenticated) {
                    tracing::debug!("Request carries no actor");
                } else {
                    error!(error = %err, "Actor resolution failed");
                }
                res.status_code(err.status_code());
                res.render(salvo::writing::Json(crate::error::ErrorResponse {
                    error: err.to_string(),
                }));
                ctrl.skip_rest();
            }
        }
    }
}

/// ## Summary
/// Middleware handler for authentication.
/// Use this as a handler in routes to protect them with authentication.
pub struct AuthMiddleware;

/// ## Summary
/// Retrieves the actor stored by [`AuthMiddleware`].
///
/// ## Errors
/// Returns `NotAuthenticated` if the middleware did not run for this request.
pub fn get_actor_from_depot(depot: &Depot) -> AppResult<Actor> {
    depot
        .get::<Actor>(depot_keys::ACTOR)
        .cloned()
        .map_err(|_err| AppError::NotAuthenticated)
}

#[cfg(test)]
mod tests {
    use salvo::http::HeaderValue;

    use super::*;

    fn proxy_settings() -> Settings {
        let mut settings = Settings::defaults().expect("defaults");
        settings.auth.method = AuthMethod::Proxy;
        settings
    }

    #[test]
    fn test_single_user_resolves_configured_operator() {
        let settings = Settings::defaults().expect("defaults");
        let actor = resolve_actor(&HeaderMap::new(), &settings).expect("actor");
        assert_eq!(actor.id, "operator");
        assert_eq!(actor.role, Role::Manager);
    }

    #[test]
    fn test_proxy_reads_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("u-7"));
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("reception"));
        let actor = resolve_actor(&headers, &proxy_settings()).expect("actor");
        assert_eq!(actor.name, "u-7");
        assert_eq!(actor.role, Role::Reception);

        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("janitor"));
        assert!(matches!(
            resolve_actor(&headers, &proxy_settings()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_proxy_without_headers_is_unauthenticated() {
        assert!(matches!(
            resolve_actor(&HeaderMap::new(), &proxy_settings()),
            Err(AppError::NotAuthenticated)
        ));
    }
}
