use crate::kafka::publish_raw_batch;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use eeg_core::auth::AuthUser;
use eeg_core::bus::{KernelSelector, RawBatch, RawRecord};
use eeg_core::ids::raw_batch_dedup_key;
use eeg_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BulkIngestRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub records: Vec<RawRecord>,
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BulkIngestResponse {
    pub records_count: usize,
    pub duration: Option<u64>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SingleSampleRequest {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub channels: [f32; 4],
    #[serde(default)]
    pub attention: Option<f64>,
    #[serde(default)]
    pub meditation: Option<f64>,
}

/// Runs the batch through the legacy ML-backed kernel.
async fn bulk_ingest(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
    Json(body): Json<BulkIngestRequest>,
) -> Result<(StatusCode, Json<BulkIngestResponse>), AppError> {
    ingest_records(&state, &user_id, body.records, body.duration, KernelSelector::LegacyMl).await
}

/// Same ingest contract as `bulk_ingest`, routed to the FFT-only kernel —
/// matches the original service's separate `eeg/bulk-fft` endpoint.
async fn bulk_ingest_fft(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
    Json(body): Json<BulkIngestRequest>,
) -> Result<(StatusCode, Json<BulkIngestResponse>), AppError> {
    ingest_records(&state, &user_id, body.records, body.duration, KernelSelector::FftOnly).await
}

async fn ingest_records(
    state: &AppState,
    user_id: &str,
    records: Vec<RawRecord>,
    duration: Option<u64>,
    kernel: KernelSelector,
) -> Result<(StatusCode, Json<BulkIngestResponse>), AppError> {
    if records.is_empty() {
        return Err(AppError::bad_request("records must not be empty"));
    }
    let user_uuid = Uuid::parse_str(user_id)
        .map_err(|_| AppError::unauthorized("invalid subject claim"))?;

    let first_ts = records[0].timestamp.timestamp_micros();
    let dedup_key = raw_batch_dedup_key(user_id, first_ts);

    let records_count = records.len();
    let batch = RawBatch {
        user_id: user_uuid,
        records,
        duration,
        attempts: 0,
        kernel,
    };

    publish_raw_batch(&state.producer, &batch, &dedup_key)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "raw batch publish failed");
            AppError::bad_gateway("failed to enqueue batch for processing")
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(BulkIngestResponse {
            records_count,
            duration,
        }),
    ))
}

async fn single_sample(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
    Json(body): Json<SingleSampleRequest>,
) -> Result<(StatusCode, Json<BulkIngestResponse>), AppError> {
    let record = RawRecord {
        sample_index: 0,
        timestamp: body.timestamp,
        eeg: body.channels,
    };
    ingest_records(&state, &user_id, vec![record], None, KernelSelector::FftOnly).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/eeg/bulk", post(bulk_ingest))
        .route("/eeg/bulk-fft", post(bulk_ingest_fft))
        .route("/eeg/data", post(single_sample))
}
