use salvo::conn::TcpListener;
use salvo::{Listener, Router};
use darkroom_app::app::api::routes;
use darkroom_app::config::SettingsHandler;
use darkroom_app::studio_handler::StudioHandler;
use darkroom_app::worker::Workers;
use darkroom_core::config::load_config;
use darkroom_service::Studio;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Darkroom studio sync service");

    let config = load_config()?;

    tracing::info!(
        database = %config.local.database_url,
        cloud = ?config.cloud.url,
        auth = ?config.auth.method,
        "Configuration loaded"
    );

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let studio = Studio::open(config.clone()).await?;
    tracing::info!(online = studio.is_online(), "Local store ready");

    let workers = Workers::spawn(&studio);

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(StudioHandler { studio })
        .hoop(SettingsHandler::new(config))
        .push(routes());

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    workers.abort();
    Ok(())
}
