use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic carrying raw sample batches from ingress to the processing
/// workers, partitioned by user id.
pub const TOPIC_RAW: &str = "eeg.raw.data";
/// Topic carrying processed per-second metric batches, partitioned by
/// user id, consumed by both the gateway (for fan-out) and persistence.
pub const TOPIC_PROCESSED: &str = "eeg.processed.data";
/// Dead-letter destination for raw batches that exhaust the worker's
/// retry budget (§4.2).
pub const TOPIC_RAW_DLQ: &str = "eeg.raw.data.dlq";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub sample_index: u64,
    pub timestamp: DateTime<Utc>,
    pub eeg: [f32; 4],
}

/// Which `SignalKernel` implementation the worker should run this batch
/// through (§4.1). Set by the ingress route that accepted the batch —
/// `/eeg/bulk` selects the legacy ML-backed kernel, `/eeg/bulk-fft` and
/// `/eeg/data` select the FFT-only kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelSelector {
    LegacyMl,
    FftOnly,
}

impl Default for KernelSelector {
    fn default() -> Self {
        KernelSelector::FftOnly
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBatch {
    pub user_id: Uuid,
    pub records: Vec<RawRecord>,
    #[serde(default)]
    pub duration: Option<u64>,
    /// How many times this batch has already been retried after a
    /// processing failure. Carried on the wire so a republish to
    /// `TOPIC_RAW` doesn't reset the retry budget back to zero.
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub kernel: KernelSelector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub timestamp: DateTime<Utc>,
    pub focus_label: f64,
    pub stress_label: f64,
    pub wellness_label: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedBatch {
    pub user_id: Uuid,
    pub records: Vec<ProcessedRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEnvelope {
    #[serde(flatten)]
    pub batch: RawBatch,
    pub failure_reason: String,
}
