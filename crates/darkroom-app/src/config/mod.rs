//! Studio settings as seen by request handlers.

use std::sync::Arc;

use salvo::async_trait;
pub use darkroom_core::config::*;

use darkroom_core::error::CoreError;

use crate::error::{AppError, AppResult};

/// Router hoop that makes the studio's loaded settings available to every
/// handler below it. The settings are shared, not copied, per request.
pub struct SettingsHandler {
    settings: Arc<Settings>,
}

impl SettingsHandler {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

#[async_trait]
impl salvo::Handler for SettingsHandler {
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.settings));
    }
}

/// ## Summary
/// The studio settings mounted by [`SettingsHandler`].
///
/// ## Errors
/// Returns a configuration error when the route was built without the hoop.
pub fn settings_from_depot(depot: &salvo::Depot) -> AppResult<Arc<Settings>> {
    depot.obtain::<Arc<Settings>>().cloned().map_err(|_missing| {
        AppError::CoreError(CoreError::ConfigError(
            "studio settings are not mounted on this route".to_string(),
        ))
    })
}

#[cfg(test)]
mod tests;
