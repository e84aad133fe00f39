//! Taskhub server entry point.

use anyhow::Context;
use taskhub_config::Config;
use taskhub_server::{AppState, infra::db, routes};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_file_loaded {
        info!("loaded .env file");
    }

    let config = Config::from_env().context("invalid configuration")?;

    let pool = db::connect(&config.database.url)
        .await
        .context("failed to open database")?;
    db::init_schema(&pool)
        .await
        .context("failed to initialize schema")?;

    // Every shared component is built here once and handed down by handle;
    // teardown happens when the process exits and both in-memory structures
    // (filter, registry) are deliberately forgotten.
    let state = AppState::new(config, pool);
    let stats = state.revocations.stats();
    info!(
        bits = stats.bits,
        hash_count = stats.hash_count,
        "revocation filter ready"
    );

    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "taskhub server listening");

    let app = routes::create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
