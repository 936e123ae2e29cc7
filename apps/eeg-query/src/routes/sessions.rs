use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use eeg_core::auth::AuthUser;
use eeg_core::models::EegRecordRow;
use eeg_core::AppError;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SessionInterval {
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SessionDataRequest {
    pub label: String,
    #[serde(default)]
    pub duration: Option<i64>,
    pub timestamps: Vec<SessionInterval>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TrackSessionRequest {
    pub session_data: SessionDataRequest,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TrackSessionResponse {
    pub duration_seconds: i64,
    pub duration_source: &'static str,
    pub focus_data: Vec<f64>,
    pub stress_data: Vec<f64>,
    pub wellness_data: Vec<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
    pub was_aggregated: bool,
    pub eeg_records_count: usize,
    pub aggregated_data_points: usize,
}

/// Applies §4.5's "10-point-or-raw" display policy: return one point per
/// raw sample when there are 10 or fewer, otherwise partition into
/// exactly 10 contiguous buckets and report each bucket's midpoint
/// timestamp alongside its mean. `n` samples split into 10 buckets of
/// `n / 10` with the first `n % 10` buckets taking one extra sample, so
/// the bucket count is exactly 10 regardless of whether `n` is a
/// multiple of 10.
fn bucket_for_display(rows: &[EegRecordRow]) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<DateTime<Utc>>, bool) {
    if rows.len() <= 10 {
        let focus = rows.iter().map(|r| r.focus_label).collect();
        let stress = rows.iter().map(|r| r.stress_label).collect();
        let wellness = rows.iter().map(|r| r.wellness_label).collect();
        let timestamps = rows.iter().map(|r| r.timestamp).collect();
        return (focus, stress, wellness, timestamps, false);
    }

    let base = rows.len() / 10;
    let remainder = rows.len() % 10;
    let mut focus = Vec::with_capacity(10);
    let mut stress = Vec::with_capacity(10);
    let mut wellness = Vec::with_capacity(10);
    let mut timestamps = Vec::with_capacity(10);

    let mut start = 0;
    for bucket in 0..10 {
        let size = base + if bucket < remainder { 1 } else { 0 };
        let chunk = &rows[start..start + size];
        start += size;
        let n = chunk.len() as f64;
        focus.push(chunk.iter().map(|r| r.focus_label).sum::<f64>() / n);
        stress.push(chunk.iter().map(|r| r.stress_label).sum::<f64>() / n);
        wellness.push(chunk.iter().map(|r| r.wellness_label).sum::<f64>() / n);
        timestamps.push(chunk[chunk.len() / 2].timestamp);
    }
    (focus, stress, wellness, timestamps, true)
}

async fn track_session(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
    Json(body): Json<TrackSessionRequest>,
) -> Result<Json<TrackSessionResponse>, AppError> {
    let user_uuid = Uuid::parse_str(&user_id).map_err(|_| AppError::unauthorized("invalid subject"))?;
    let data = body.session_data;

    let (duration_seconds, duration_source) = match data.duration {
        Some(explicit) => (explicit, "user_provided"),
        None => {
            let computed: i64 = data
                .timestamps
                .iter()
                .filter_map(|iv| iv.end.map(|end| (end - iv.start).num_seconds()))
                .sum();
            (computed, "calculated_from_timestamps")
        }
    };

    let mut rows: Vec<EegRecordRow> = Vec::new();
    for interval in &data.timestamps {
        let end = interval.end.unwrap_or_else(Utc::now);
        let mut found = sqlx::query_as::<_, EegRecordRow>(
            "SELECT * FROM eeg_records WHERE user_id = $1 AND timestamp >= $2 AND timestamp <= $3 ORDER BY timestamp",
        )
        .bind(user_uuid)
        .bind(interval.start)
        .bind(end)
        .fetch_all(&state.db)
        .await
        .map_err(eeg_core::map_db_error)?;
        rows.append(&mut found);
    }
    rows.sort_by_key(|r| r.timestamp);

    let eeg_records_count = rows.len();
    let overall_focus = mean(rows.iter().map(|r| r.focus_label));
    let overall_stress = mean(rows.iter().map(|r| r.stress_label));
    let overall_wellness = mean(rows.iter().map(|r| r.wellness_label));

    let (focus_data, stress_data, wellness_data, timestamps, was_aggregated) = bucket_for_display(&rows);
    let aggregated_data_points = focus_data.len();

    let session_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, date, duration, label, focus, stress, wellness, created_at, updated_at)
         VALUES ($1, $2, now(), $3, $4, $5, $6, $7, now(), now())",
    )
    .bind(session_id)
    .bind(user_uuid)
    .bind(duration_seconds)
    .bind(&data.label)
    .bind(overall_focus)
    .bind(overall_stress)
    .bind(overall_wellness)
    .execute(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    Ok(Json(TrackSessionResponse {
        duration_seconds,
        duration_source,
        focus_data,
        stress_data,
        wellness_data,
        timestamps,
        was_aggregated,
        eeg_records_count,
        aggregated_data_points,
    }))
}

fn mean(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let count = values.clone().count();
    if count == 0 {
        0.0
    } else {
        values.sum::<f64>() / count as f64
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SessionHistoryEntry {
    pub date: DateTime<Utc>,
    pub duration: i64,
    pub label: String,
}

async fn session_history(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
) -> Result<Json<Vec<SessionHistoryEntry>>, AppError> {
    let user_uuid = Uuid::parse_str(&user_id).map_err(|_| AppError::unauthorized("invalid subject"))?;
    let rows = sqlx::query(
        "SELECT date, duration, label FROM sessions WHERE user_id = $1 ORDER BY date DESC",
    )
    .bind(user_uuid)
    .fetch_all(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    let entries = rows
        .into_iter()
        .map(|row| {
            Ok(SessionHistoryEntry {
                date: row.try_get("date")?,
                duration: row.try_get("duration")?,
                label: row.try_get("label")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(eeg_core::map_db_error)?;
    Ok(Json(entries))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SessionDetailsResponse {
    pub focus_data: Vec<f64>,
    pub stress_data: Vec<f64>,
    pub wellness_data: Vec<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
    pub was_aggregated: bool,
}

async fn session_details(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetailsResponse>, AppError> {
    let user_uuid = Uuid::parse_str(&user_id).map_err(|_| AppError::unauthorized("invalid subject"))?;

    let session = sqlx::query("SELECT date, duration FROM sessions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_uuid)
        .fetch_optional(&state.db)
        .await
        .map_err(eeg_core::map_db_error)?
        .ok_or_else(|| AppError::not_found("session not found"))?;

    let date: DateTime<Utc> = session.try_get("date").map_err(eeg_core::map_db_error)?;
    let duration: i64 = session.try_get("duration").map_err(eeg_core::map_db_error)?;
    let end = date + chrono::Duration::seconds(duration);

    let rows = sqlx::query_as::<_, EegRecordRow>(
        "SELECT * FROM eeg_records WHERE user_id = $1 AND timestamp >= $2 AND timestamp <= $3 ORDER BY timestamp",
    )
    .bind(user_uuid)
    .bind(date)
    .bind(end)
    .fetch_all(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    let (focus_data, stress_data, wellness_data, timestamps, was_aggregated) = bucket_for_display(&rows);

    Ok(Json(SessionDetailsResponse {
        focus_data,
        stress_data,
        wellness_data,
        timestamps,
        was_aggregated,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions/track", post(track_session))
        .route("/sessions/history", get(session_history))
        .route("/sessions/{id}/details", get(session_details))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ts_offset: i64, focus: f64) -> EegRecordRow {
        EegRecordRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            timestamp: Utc::now() + chrono::Duration::seconds(ts_offset),
            focus_label: focus,
            stress_label: 1.0,
            wellness_label: 50.0,
            created_at: Utc::now(),
            created_by: None,
            updated_at: Utc::now(),
            updated_by: None,
        }
    }

    #[test]
    fn ten_or_fewer_samples_return_one_point_each() {
        let rows: Vec<EegRecordRow> = (0..10).map(|i| row(i, i as f64)).collect();
        let (focus, _, _, timestamps, was_aggregated) = bucket_for_display(&rows);
        assert_eq!(focus.len(), 10);
        assert_eq!(timestamps.len(), 10);
        assert!(!was_aggregated);
    }

    #[test]
    fn more_than_ten_samples_bucket_to_exactly_ten() {
        let rows: Vec<EegRecordRow> = (0..110).map(|i| row(i, i as f64)).collect();
        let (focus, _, _, _, was_aggregated) = bucket_for_display(&rows);
        assert_eq!(focus.len(), 10);
        assert!(was_aggregated);
    }

    #[test]
    fn non_multiple_of_ten_still_buckets_to_exactly_ten() {
        let rows: Vec<EegRecordRow> = (0..23).map(|i| row(i, i as f64)).collect();
        let (focus, stress, wellness, timestamps, was_aggregated) = bucket_for_display(&rows);
        assert_eq!(focus.len(), 10);
        assert_eq!(stress.len(), 10);
        assert_eq!(wellness.len(), 10);
        assert_eq!(timestamps.len(), 10);
        assert!(was_aggregated);
    }
}
