mod config;
mod kafka;
mod routes;
mod state;
mod subscribers;

use config::GatewayConfig;
use eeg_core::auth::JwtVerifier;
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use subscribers::SubscriberRegistry;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = Arc::new(GatewayConfig::from_env()?);
    let jwt = JwtVerifier::new(
        &config.shared.jwt_secret_key,
        &config.shared.jwt_issuer,
        &config.shared.jwt_audience,
    );
    let producer = kafka::build_producer(&config)?;
    let eeg_registry = Arc::new(SubscriberRegistry::default());
    let metrics_registry = Arc::new(SubscriberRegistry::default());

    let state = AppState {
        config: config.clone(),
        jwt,
        producer,
        eeg_registry,
        metrics_registry: metrics_registry.clone(),
        http: reqwest::Client::builder().build()?,
    };

    let cancel = CancellationToken::new();
    kafka::spawn_processed_consumer((*config).clone(), metrics_registry, cancel.clone())?;

    let app = routes::router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "eeg-gateway listening");

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
