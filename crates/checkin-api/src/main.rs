//! `checkin-server`: serves the check-in endpoint.

use checkin_api::config::AppConfig;
use checkin_api::routes::router;
use checkin_api::state::AppState;
use checkin_storage::Database;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.level.clone().into()),
        )
        .init();

    let settings = config.settings()?;
    info!(
        version = checkin_core::VERSION,
        open = %settings.hours.open,
        close = %settings.hours.close,
        ranking_start = %settings.ranking_start,
        "starting check-in service"
    );

    let database = Database::connect_or_degraded(config.database.to_database_config()).await;
    if !database.is_successful() {
        warn!(path = %config.database.path, "serving without a database");
    }

    let state = AppState::new(database.clone(), settings);
    let listener = TcpListener::bind(config.server.addr()).await?;
    info!(addr = %config.server.addr(), "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;
    info!("check-in service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
