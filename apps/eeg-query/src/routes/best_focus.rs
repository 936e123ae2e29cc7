use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use eeg_core::auth::AuthUser;
use eeg_core::AppError;
use serde::Serialize;
use sqlx::Row;
use uuid::Uuid;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BestFocusTimeResponse {
    pub range: Option<String>,
}

/// Scans hourly focus means over the trailing 30 days, keeps hours whose
/// mean exceeds the overall hourly mean, coalesces consecutive qualifying
/// hours into ranges, and returns the range maximizing (mean, duration).
#[utoipa::path(get, path = "/eeg/best-focus-time", responses((status = 200, body = BestFocusTimeResponse)))]
async fn best_focus_time(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
) -> Result<Json<BestFocusTimeResponse>, AppError> {
    let user_uuid = Uuid::parse_str(&user_id).map_err(|_| AppError::unauthorized("invalid subject"))?;

    let rows = sqlx::query(
        "SELECT EXTRACT(HOUR FROM timestamp)::int AS hour, AVG(focus_label) AS focus
         FROM eeg_records
         WHERE user_id = $1 AND timestamp >= CURRENT_DATE - INTERVAL '30 days'
         GROUP BY hour
         ORDER BY hour",
    )
    .bind(user_uuid)
    .fetch_all(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    let mut hourly = [None; 24];
    for row in rows {
        let hour: i32 = row.try_get("hour").map_err(eeg_core::map_db_error)?;
        let focus: f64 = row.try_get("focus").map_err(eeg_core::map_db_error)?;
        if (0..24).contains(&hour) {
            hourly[hour as usize] = Some(focus);
        }
    }

    let observed: Vec<f64> = hourly.iter().filter_map(|v| *v).collect();
    if observed.is_empty() {
        return Ok(Json(BestFocusTimeResponse { range: None }));
    }
    let overall_mean = observed.iter().sum::<f64>() / observed.len() as f64;

    let qualifying: Vec<bool> = hourly.iter().map(|v| v.map(|m| m > overall_mean).unwrap_or(false)).collect();

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let mut start: Option<usize> = None;
    for (hour, is_qualifying) in qualifying.iter().enumerate() {
        match (is_qualifying, start) {
            (true, None) => start = Some(hour),
            (false, Some(s)) => {
                ranges.push((s, hour - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        ranges.push((s, 23));
    }

    let best = ranges.into_iter().max_by(|a, b| {
        let mean_a = range_mean(&hourly, *a);
        let mean_b = range_mean(&hourly, *b);
        let duration_a = a.1 - a.0;
        let duration_b = b.1 - b.0;
        mean_a
            .partial_cmp(&mean_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(duration_a.cmp(&duration_b))
    });

    let range = best.map(|(start, end)| format!("{} to {}", format_hour(start), format_hour(end + 1)));
    Ok(Json(BestFocusTimeResponse { range }))
}

fn range_mean(hourly: &[Option<f64>; 24], range: (usize, usize)) -> f64 {
    let values: Vec<f64> = hourly[range.0..=range.1].iter().filter_map(|v| *v).collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn format_hour(hour: usize) -> String {
    let hour = hour % 24;
    let period = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display:02}:00 {period}")
}

pub fn router() -> Router<AppState> {
    Router::new().route("/eeg/best-focus-time", get(best_focus_time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_hour_handles_noon_and_midnight() {
        assert_eq!(format_hour(0), "12:00 AM");
        assert_eq!(format_hour(12), "12:00 PM");
        assert_eq!(format_hour(13), "01:00 PM");
    }
}
