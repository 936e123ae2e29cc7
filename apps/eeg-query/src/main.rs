mod config;
mod routes;
mod state;

use config::QueryConfig;
use eeg_aggregation::AggregationEngine;
use eeg_core::auth::JwtVerifier;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = Arc::new(QueryConfig::from_env()?);
    let db = PgPoolOptions::new()
        .min_connections(15)
        .max_connections(25)
        .acquire_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(3600))
        .test_before_acquire(true)
        .connect(&config.shared.database_url)
        .await?;

    let jwt = JwtVerifier::new(
        &config.shared.jwt_secret_key,
        &config.shared.jwt_issuer,
        &config.shared.jwt_audience,
    );
    let poll_interval = Duration::from_secs(config.shared.aggregation_poll_interval_seconds);
    let aggregation = Arc::new(AggregationEngine::new(db.clone(), poll_interval));

    let state = AppState {
        config: config.clone(),
        db,
        jwt,
        aggregation: aggregation.clone(),
    };

    let cancel = CancellationToken::new();
    (*aggregation).clone().start(cancel.clone());

    let app = routes::router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "eeg-query listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
