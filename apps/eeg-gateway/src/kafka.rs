use crate::config::GatewayConfig;
use crate::subscribers::{MetricLabelPair, MetricsPayload, ServerMessage, SubscriberRegistry};
use eeg_core::bus::{ProcessedBatch, RawBatch, TOPIC_PROCESSED, TOPIC_RAW};
use eeg_core::models::{focus_or_stress_label, wellness_label};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn build_producer(config: &GatewayConfig) -> anyhow::Result<FutureProducer> {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.shared.kafka_broker)
        .set("message.timeout.ms", "5000")
        .set("enable.idempotence", "true");
    if config.shared.app_env.requires_secure_kafka() {
        client_config
            .set("security.protocol", "SASL_SSL")
            .set("sasl.mechanisms", "OAUTHBEARER");
    }
    Ok(client_config.create()?)
}

fn build_consumer(config: &GatewayConfig, group_suffix: &str) -> anyhow::Result<StreamConsumer> {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.shared.kafka_broker)
        .set(
            "group.id",
            format!("{}-{}", config.shared.kafka_group_id, group_suffix),
        )
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "latest");
    if config.shared.app_env.requires_secure_kafka() {
        client_config
            .set("security.protocol", "SASL_SSL")
            .set("sasl.mechanisms", "OAUTHBEARER");
    }
    Ok(client_config.create()?)
}

/// Publishes one accepted raw frame batch with a flush budget of 5s,
/// keyed by user id so all of one user's batches land in the same
/// partition and preserve ordering (§5).
pub async fn publish_raw_batch(
    producer: &FutureProducer,
    batch: &RawBatch,
    dedup_key: &str,
) -> anyhow::Result<()> {
    let payload = serde_json::to_vec(batch)?;
    let key = batch.user_id.to_string();
    producer
        .send(
            FutureRecord::to(TOPIC_RAW)
                .key(&key)
                .payload(&payload)
                .headers(rdkafka::message::OwnedHeaders::new().insert(rdkafka::message::Header {
                    key: "dedup-key",
                    value: Some(dedup_key),
                })),
            Duration::from_secs(5),
        )
        .await
        .map_err(|(err, _)| anyhow::anyhow!("kafka publish failed: {err}"))?;
    Ok(())
}

/// Consumes `eeg.processed.data` under consumer group `gateway` and fans
/// each batch out to the `/ws/metrics` subscriber set for its user.
pub fn spawn_processed_consumer(
    config: GatewayConfig,
    registry: Arc<SubscriberRegistry<ServerMessage>>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let consumer = build_consumer(&config, "gateway")?;
    consumer.subscribe(&[TOPIC_PROCESSED])?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("processed-topic consumer shutting down");
                    break;
                }
                message = consumer.recv() => {
                    match message {
                        Ok(borrowed) => {
                            if let Some(payload) = borrowed.payload() {
                                if let Err(err) = handle_processed_message(payload, &registry) {
                                    tracing::warn!(error = %err, "failed to handle processed message");
                                }
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "kafka consumer poll error");
                        }
                    }
                }
            }
        }
    });
    Ok(())
}

fn handle_processed_message(
    payload: &[u8],
    registry: &SubscriberRegistry<ServerMessage>,
) -> anyhow::Result<()> {
    let batch: ProcessedBatch = serde_json::from_slice(payload)?;
    let Some(latest) = batch.records.last() else {
        return Ok(());
    };

    let message = ServerMessage::ProcessedMetrics {
        user_id: batch.user_id,
        timestamp: latest.timestamp,
        metrics: MetricsPayload {
            focus: MetricLabelPair {
                value: latest.focus_label,
                label: focus_or_stress_label(latest.focus_label),
            },
            stress: MetricLabelPair {
                value: latest.stress_label,
                label: focus_or_stress_label(latest.stress_label),
            },
            wellness: MetricLabelPair {
                value: latest.wellness_label,
                label: wellness_label(latest.wellness_label),
            },
        },
    };
    registry.dispatch(batch.user_id, message);
    Ok(())
}
