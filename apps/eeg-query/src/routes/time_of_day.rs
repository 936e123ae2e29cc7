use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use eeg_core::auth::AuthUser;
use eeg_core::time_buckets::TimeOfDayBucket;
use eeg_core::AppError;
use serde::Serialize;
use sqlx::Row;
use uuid::Uuid;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TimeOfDayEntry {
    pub bucket: &'static str,
    pub focus: f64,
    pub stress: f64,
    pub wellness: f64,
}

#[utoipa::path(get, path = "/aggregate-by-time-of-day", responses((status = 200, body = [TimeOfDayEntry])))]
async fn time_of_day_aggregate(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
) -> Result<Json<Vec<TimeOfDayEntry>>, AppError> {
    let user_uuid = Uuid::parse_str(&user_id).map_err(|_| AppError::unauthorized("invalid subject"))?;

    let rows = sqlx::query(
        "SELECT EXTRACT(HOUR FROM timestamp)::int AS hour,
                AVG(focus_label) AS focus, AVG(stress_label) AS stress, AVG(wellness_label) AS wellness
         FROM eeg_records
         WHERE user_id = $1 AND timestamp::date = CURRENT_DATE
         GROUP BY hour",
    )
    .bind(user_uuid)
    .fetch_all(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    let mut focus_sum = [0.0; 5];
    let mut stress_sum = [0.0; 5];
    let mut wellness_sum = [0.0; 5];
    let mut counts = [0u32; 5];

    for row in rows {
        let hour: i32 = row.try_get("hour").map_err(eeg_core::map_db_error)?;
        let bucket = TimeOfDayBucket::from_hour(hour as usize);
        let idx = TimeOfDayBucket::all().iter().position(|b| *b == bucket).unwrap();
        focus_sum[idx] += row.try_get::<Option<f64>, _>("focus").map_err(eeg_core::map_db_error)?.unwrap_or(0.0);
        stress_sum[idx] += row.try_get::<Option<f64>, _>("stress").map_err(eeg_core::map_db_error)?.unwrap_or(0.0);
        wellness_sum[idx] += row.try_get::<Option<f64>, _>("wellness").map_err(eeg_core::map_db_error)?.unwrap_or(0.0);
        counts[idx] += 1;
    }

    let entries = TimeOfDayBucket::all()
        .iter()
        .enumerate()
        .map(|(idx, bucket)| {
            let n = counts[idx].max(1) as f64;
            TimeOfDayEntry {
                bucket: bucket.label(),
                focus: round2(focus_sum[idx] / n),
                stress: round2(stress_sum[idx] / n),
                wellness: round2(wellness_sum[idx] / n),
            }
        })
        .collect();

    Ok(Json(entries))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn router() -> Router<AppState> {
    Router::new().route("/aggregate-by-time-of-day", get(time_of_day_aggregate))
}
