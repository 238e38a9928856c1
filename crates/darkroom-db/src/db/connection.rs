use std::str::FromStr;
use std::sync::Arc;

use darkroom_core::config::{LocalEndpoint, LocalStoreConfig};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::db::LocalBridge;
use crate::db::detached::DetachedBridge;
use crate::db::endpoint::SqliteEndpoint;
use crate::db::store::LocalStore;
use crate::db::stream::{StreamBridge, serve_endpoint};

/// Size of the in-process duplex pipe between bridge and endpoint.
const EMBEDDED_PIPE_BYTES: usize = 64 * 1024;

/// ## Summary
/// Creates the SQLite pool behind the privileged endpoint.
///
/// In-memory databases are pinned to one long-lived connection so every
/// statement sees the same database.
///
/// ## Errors
/// Returns an error if the URL is invalid or the database cannot be opened.
#[tracing::instrument(skip(database_url), fields(pool_size = size))]
pub async fn create_local_pool(database_url: &str, size: u8) -> anyhow::Result<SqlitePool> {
    tracing::debug!("Creating local store connection pool");

    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    let mut options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let size = if in_memory { 1 } else { u32::from(size.max(1)) };
    let pool = SqlitePoolOptions::new()
        .max_connections(size)
        .min_connections(if in_memory { 1 } else { 0 })
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    tracing::info!(
        pool_size = size,
        in_memory,
        "Local store connection pool created successfully"
    );

    Ok(pool)
}

/// ## Summary
/// Opens the local store according to configuration and brings its schema up to date.
///
/// The embedded endpoint runs on a spawned task and talks to the store over a
/// duplex stream with the same framing an out-of-process endpoint uses.
///
/// ## Errors
/// Returns an error if the pool cannot be created or the migration fails.
#[tracing::instrument(skip(config), fields(endpoint = ?config.endpoint))]
pub async fn open_local_store(config: &LocalStoreConfig) -> anyhow::Result<LocalStore> {
    let bridge: Arc<dyn LocalBridge> = match config.endpoint {
        LocalEndpoint::Embedded => {
            let pool = create_local_pool(&config.database_url, config.max_connections).await?;
            Arc::new(embedded_bridge(pool))
        }
        LocalEndpoint::Detached => {
            tracing::warn!("Local store is detached; reads return nothing and writes are dropped");
            Arc::new(DetachedBridge::default())
        }
    };

    let store = LocalStore::new(bridge);
    store.migrate().await?;
    Ok(store)
}

/// ## Summary
/// Serves `pool` on a background task and returns a bridge connected to it.
#[must_use]
pub fn embedded_bridge(pool: SqlitePool) -> StreamBridge {
    let (client, server) = tokio::io::duplex(EMBEDDED_PIPE_BYTES);
    let endpoint = SqliteEndpoint::new(pool);

    tokio::spawn(async move {
        if let Err(err) = serve_endpoint(server, endpoint).await {
            tracing::error!(error = %err, "Local store endpoint stopped");
        }
    });

    StreamBridge::new(client)
}

/// ## Summary
/// Opens a fresh in-memory store with the full schema. Used by tests and tooling.
///
/// ## Errors
/// Returns an error if the pool or migration fails.
pub async fn open_in_memory() -> anyhow::Result<LocalStore> {
    let pool = create_local_pool("sqlite::memory:", 1).await?;
    let store = LocalStore::new(Arc::new(embedded_bridge(pool)));
    store.migrate().await?;
    Ok(store)
}
