mod config;
mod processing;
mod runner;

use config::WorkerConfig;
use eeg_kernel::{KernelA, KernelB, SignalKernel};
use rdkafka::config::ClientConfig;
use runner::{Kernels, ProcessingWorker};
use sqlx::postgres::PgPoolOptions;
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

    let config = WorkerConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .min_connections(15)
        .max_connections(25)
        .acquire_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(3600))
        .test_before_acquire(true)
        .connect_lazy(&config.shared.database_url)?;

    let mut producer_config = ClientConfig::new();
    producer_config
        .set("bootstrap.servers", &config.shared.kafka_broker)
        .set("message.timeout.ms", "5000")
        .set("enable.idempotence", "true");
    let producer = producer_config.create()?;

    let kernels = Kernels {
        legacy_ml: Arc::new(KernelA::new()) as Arc<dyn SignalKernel>,
        fft_only: Arc::new(KernelB::default()) as Arc<dyn SignalKernel>,
    };
    let cancel = CancellationToken::new();

    let worker = ProcessingWorker::new(pool, kernels, producer, config);
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        cancel_for_signal.cancel();
    });

    worker.run(cancel).await
}
