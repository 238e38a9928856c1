use salvo::async_trait;

use crate::error::AppResult;
use darkroom_core::error::CoreError;
use darkroom_service::Studio;

/// Puts a handle to the studio into every request's depot.
pub struct StudioHandler {
    pub studio: Studio,
}

#[async_trait]
impl salvo::Handler for StudioHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(self.studio.clone());
    }
}

/// ## Summary
/// Retrieves the studio from the depot.
///
/// ## Errors
/// Returns an error if the studio is not found in the depot.
pub fn get_studio_from_depot(depot: &salvo::Depot) -> AppResult<Studio> {
    depot
        .obtain::<Studio>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Studio not found in depot").into())
}
