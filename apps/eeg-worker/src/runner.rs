use crate::config::WorkerConfig;
use crate::processing::process_batch;
use eeg_core::bus::{
    DeadLetterEnvelope, KernelSelector, ProcessedBatch, RawBatch, TOPIC_PROCESSED, TOPIC_RAW,
    TOPIC_RAW_DLQ,
};
use eeg_kernel::SignalKernel;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use sqlx::PgPool;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

const SOFT_TIMEOUT: Duration = Duration::from_secs(30);
const HARD_TIMEOUT: Duration = Duration::from_secs(45);
const MAX_ATTEMPTS: u32 = 3;

/// The two `SignalKernel` implementations a batch can be routed through,
/// selected per-batch by `RawBatch::kernel` rather than fixed per worker
/// process — `/eeg/bulk` and `/eeg/bulk-fft` share one consumer group.
#[derive(Clone)]
pub struct Kernels {
    pub legacy_ml: Arc<dyn SignalKernel>,
    pub fft_only: Arc<dyn SignalKernel>,
}

impl Kernels {
    fn select(&self, selector: KernelSelector) -> &dyn SignalKernel {
        match selector {
            KernelSelector::LegacyMl => self.legacy_ml.as_ref(),
            KernelSelector::FftOnly => self.fft_only.as_ref(),
        }
    }
}

/// Bounded-concurrency consumer of `eeg.raw.data`: a `Semaphore` gates
/// in-flight batches. `config.max_concurrent_batches` must stay at 1 so
/// a user's batches (partitioned by user id) are processed in the order
/// Kafka delivered them; each batch races a soft/hard deadline via
/// `tokio::time::timeout`.
pub struct ProcessingWorker {
    pool: PgPool,
    kernels: Kernels,
    producer: FutureProducer,
    config: WorkerConfig,
    semaphore: Arc<Semaphore>,
    processed_count: Arc<AtomicU64>,
}

impl ProcessingWorker {
    pub fn new(
        pool: PgPool,
        kernels: Kernels,
        producer: FutureProducer,
        config: WorkerConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_batches.max(1) as usize));
        ProcessingWorker {
            pool,
            kernels,
            producer,
            config,
            semaphore,
            processed_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<()> {
        let consumer = build_consumer(&self.config)?;
        consumer.subscribe(&[TOPIC_RAW])?;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("processing worker shutting down");
                    break;
                }
                message = consumer.recv() => {
                    let borrowed = match message {
                        Ok(m) => m,
                        Err(err) => {
                            tracing::warn!(error = %err, "kafka consumer poll error");
                            continue;
                        }
                    };

                    let Some(payload) = borrowed.payload().map(|p| p.to_vec()) else {
                        let _ = consumer.commit_message(&borrowed, CommitMode::Async);
                        continue;
                    };

                    let permit = self.semaphore.clone().acquire_owned().await?;
                    let pool = self.pool.clone();
                    let kernels = self.kernels.clone();
                    let producer = self.producer.clone();
                    let count = self.processed_count.clone();
                    let recycle_after = self.config.recycle_after_tasks;

                    let span = tracing::info_span!("process_raw_batch");
                    tokio::spawn(async move {
                        let _permit = permit;
                        process_one(&pool, &kernels, &producer, &payload).await;
                        let processed = count.fetch_add(1, Ordering::SeqCst) + 1;
                        if processed % recycle_after == 0 {
                            tracing::info!(processed, "worker recycle threshold reached");
                        }
                    }
                    .instrument(span));

                    let _ = consumer.commit_message(&borrowed, CommitMode::Async);
                }
            }
        }
        Ok(())
    }
}

use tracing::Instrument;

async fn process_one(
    pool: &PgPool,
    kernels: &Kernels,
    producer: &FutureProducer,
    payload: &[u8],
) {
    let batch: RawBatch = match serde_json::from_slice(payload) {
        Ok(b) => b,
        Err(err) => {
            tracing::warn!(error = %err, "failed to decode raw batch, dropping");
            return;
        }
    };
    let attempt = batch.attempts;
    let kernel = kernels.select(batch.kernel);

    let result = tokio::time::timeout(HARD_TIMEOUT, run_with_soft_budget(pool, kernel, producer, &batch)).await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => retry_or_dead_letter(producer, &batch, attempt, err.to_string()).await,
        Err(_) => {
            retry_or_dead_letter(producer, &batch, attempt, "hard timeout exceeded".to_string()).await
        }
    }
}

async fn run_with_soft_budget(
    pool: &PgPool,
    kernel: &dyn SignalKernel,
    producer: &FutureProducer,
    batch: &RawBatch,
) -> anyhow::Result<()> {
    tokio::time::timeout(SOFT_TIMEOUT, async {
        let processed = process_batch(kernel, batch);
        if processed.is_empty() {
            return Ok(());
        }

        persist_metrics(pool, batch.user_id, &processed).await?;

        let out = ProcessedBatch {
            user_id: batch.user_id,
            records: processed,
        };
        let payload = serde_json::to_vec(&out)?;
        producer
            .send(
                FutureRecord::to(TOPIC_PROCESSED)
                    .key(&batch.user_id.to_string())
                    .payload(&payload),
                Duration::from_secs(5),
            )
            .await
            .map_err(|(err, _)| anyhow::anyhow!("publish processed batch failed: {err}"))?;
        Ok(())
    })
    .await
    .map_err(|_| anyhow::anyhow!("soft timeout exceeded"))?
}

async fn persist_metrics(
    pool: &PgPool,
    user_id: uuid::Uuid,
    records: &[eeg_core::bus::ProcessedRecord],
) -> anyhow::Result<()> {
    for record in records {
        sqlx::query(
            "INSERT INTO eeg_records (id, user_id, timestamp, focus_label, stress_label, wellness_label, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, now(), now())
             ON CONFLICT (user_id, timestamp) DO UPDATE
             SET focus_label = EXCLUDED.focus_label, stress_label = EXCLUDED.stress_label, wellness_label = EXCLUDED.wellness_label, updated_at = now()",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(user_id)
        .bind(record.timestamp)
        .bind(record.focus_label)
        .bind(record.stress_label)
        .bind(record.wellness_label)
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn retry_or_dead_letter(
    producer: &FutureProducer,
    batch: &RawBatch,
    attempt: u32,
    reason: String,
) {
    if attempt + 1 < MAX_ATTEMPTS {
        let backoff = Duration::from_secs(2u64.saturating_pow(attempt + 1));
        tracing::warn!(attempt = attempt + 1, %reason, "retrying batch after backoff");
        tokio::time::sleep(backoff).await;
        let mut retried = batch.clone();
        retried.attempts = attempt + 1;
        let payload = match serde_json::to_vec(&retried) {
            Ok(p) => p,
            Err(_) => return,
        };
        let _ = producer
            .send(
                FutureRecord::to(TOPIC_RAW)
                    .key(&batch.user_id.to_string())
                    .payload(&payload),
                Duration::from_secs(5),
            )
            .await;
        return;
    }

    tracing::error!(%reason, "max retries exhausted, parking on dead-letter topic");
    let mut dead = batch.clone();
    dead.attempts = attempt + 1;
    let envelope = DeadLetterEnvelope {
        batch: dead,
        failure_reason: reason,
    };
    if let Ok(payload) = serde_json::to_vec(&envelope) {
        let _ = producer
            .send(
                FutureRecord::to(TOPIC_RAW_DLQ)
                    .key(&batch.user_id.to_string())
                    .payload(&payload),
                Duration::from_secs(5),
            )
            .await;
    }
}

fn build_consumer(config: &WorkerConfig) -> anyhow::Result<StreamConsumer> {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.shared.kafka_broker)
        .set("group.id", format!("{}-worker", config.shared.kafka_group_id))
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("fetch.message.max.bytes", "1048576");
    if config.shared.app_env.requires_secure_kafka() {
        client_config
            .set("security.protocol", "SASL_SSL")
            .set("sasl.mechanisms", "OAUTHBEARER");
    }
    Ok(client_config.create()?)
}
