//! Fixtures for tests: an in-memory studio wired to a [`MemoryCloud`].

use std::sync::Arc;

use darkroom_core::actor::{Actor, Role};
use darkroom_core::config::Settings;
use darkroom_db::db::connection::open_in_memory;
use darkroom_db::db::detached::DetachedBridge;
use darkroom_db::db::store::LocalStore;

use crate::cloud::memory::MemoryCloud;
use crate::studio::Studio;

/// ## Summary
/// A studio on a fresh in-memory local store and an online memory cloud.
///
/// ## Errors
/// Returns an error if the default settings or the local store fail to load.
pub async fn memory_studio() -> anyhow::Result<(Studio, Arc<MemoryCloud>)> {
    memory_studio_with(|_| {}).await
}

/// ## Summary
/// Like [`memory_studio`], with settings adjusted by `configure` first.
/// Retry backoff starts at zero so failed entries are due again immediately.
///
/// ## Errors
/// Returns an error if the default settings or the local store fail to load.
pub async fn memory_studio_with(
    configure: impl FnOnce(&mut Settings),
) -> anyhow::Result<(Studio, Arc<MemoryCloud>)> {
    let mut settings = Settings::defaults()?;
    settings.sync.backoff_base_secs = 0;
    configure(&mut settings);
    let store = open_in_memory().await?;
    let cloud = Arc::new(MemoryCloud::new());
    let studio = Studio::new(store, cloud.clone(), settings);
    studio.connectivity.set_online(true);
    Ok((studio, cloud))
}

/// ## Summary
/// A studio with no local backing and an unreachable memory cloud.
///
/// ## Errors
/// Returns an error if the default settings fail to load.
pub fn detached_studio() -> anyhow::Result<(Studio, Arc<MemoryCloud>)> {
    let store = LocalStore::new(Arc::new(DetachedBridge::default()));
    let cloud = Arc::new(MemoryCloud::new());
    cloud.set_online(false);
    let studio = Studio::new(store, cloud.clone(), Settings::defaults()?);
    Ok((studio, cloud))
}

#[must_use]
pub fn manager() -> Actor {
    Actor::new("u-manager", "Samira Manager", Role::Manager)
}

#[must_use]
pub fn reception() -> Actor {
    Actor::new("u-reception", "Karim Desk", Role::Reception)
}

#[must_use]
pub fn photographer() -> Actor {
    Actor::new("u-photo", "Lina Lens", Role::Photographer)
}
