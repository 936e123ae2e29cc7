use crate::state::AppState;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use eeg_core::auth::AuthUser;
use eeg_core::time_buckets::week_of_month;
use eeg_core::AppError;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct RangeQuery {
    pub range: RangeKind,
}

#[derive(Debug, Clone, Copy, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Quarterly,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub color: &'static str,
    pub stroke_width: u8,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RangeSeriesResponse {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub legend: Vec<&'static str>,
}

fn build_datasets(focus: Vec<f64>, stress: Vec<f64>, wellness: Vec<f64>) -> Vec<Dataset> {
    vec![
        Dataset {
            label: "Focus".to_string(),
            data: focus,
            color: "#4f46e5",
            stroke_width: 2,
        },
        Dataset {
            label: "Stress".to_string(),
            data: stress,
            color: "#dc2626",
            stroke_width: 2,
        },
        Dataset {
            label: "Wellness".to_string(),
            data: wellness,
            color: "#16a34a",
            stroke_width: 2,
        },
    ]
}

const LEGEND: [&str; 3] = ["Focus", "Stress", "Wellness"];

#[utoipa::path(get, path = "/eeg/aggregate", params(RangeQuery), responses((status = 200, body = RangeSeriesResponse)))]
async fn range_series(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
    Query(query): Query<RangeQuery>,
) -> Result<axum::Json<RangeSeriesResponse>, AppError> {
    let user_uuid = Uuid::parse_str(&user_id).map_err(|_| AppError::unauthorized("invalid subject"))?;

    let (labels, focus, stress, wellness) = match query.range {
        RangeKind::Hourly | RangeKind::Daily => hourly_series(&state, user_uuid).await?,
        RangeKind::Weekly => weekly_series(&state, user_uuid).await?,
        RangeKind::Monthly => monthly_series(&state, user_uuid).await?,
        RangeKind::Yearly => yearly_series(&state, user_uuid).await?,
        RangeKind::Quarterly => quarterly_series(&state, user_uuid).await?,
    };

    Ok(axum::Json(RangeSeriesResponse {
        labels,
        datasets: build_datasets(focus, stress, wellness),
        legend: LEGEND.to_vec(),
    }))
}

type SeriesTuple = (Vec<String>, Vec<f64>, Vec<f64>, Vec<f64>);

/// 24 fixed buckets, labels "HH:00", sourced from `eeg_records` for today.
async fn hourly_series(state: &AppState, user_id: Uuid) -> Result<SeriesTuple, AppError> {
    let rows = sqlx::query(
        "SELECT EXTRACT(HOUR FROM timestamp)::int AS hour,
                AVG(focus_label) AS focus, AVG(stress_label) AS stress, AVG(wellness_label) AS wellness
         FROM eeg_records
         WHERE user_id = $1 AND timestamp::date = CURRENT_DATE
         GROUP BY hour",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    let mut focus = vec![0.0; 24];
    let mut stress = vec![0.0; 24];
    let mut wellness = vec![0.0; 24];
    for row in rows {
        let hour: i32 = row.try_get("hour").map_err(eeg_core::map_db_error)?;
        if !(0..24).contains(&hour) {
            continue;
        }
        focus[hour as usize] = row.try_get::<Option<f64>, _>("focus").map_err(eeg_core::map_db_error)?.unwrap_or(0.0);
        stress[hour as usize] = row.try_get::<Option<f64>, _>("stress").map_err(eeg_core::map_db_error)?.unwrap_or(0.0);
        wellness[hour as usize] = row.try_get::<Option<f64>, _>("wellness").map_err(eeg_core::map_db_error)?.unwrap_or(0.0);
    }
    let labels = (0..24).map(|h| format!("{h:02}:00")).collect();
    Ok((labels, focus, stress, wellness))
}

/// 7 fixed buckets Mon-Sun, sourced from `daily_eeg_records` for the
/// current ISO week.
async fn weekly_series(state: &AppState, user_id: Uuid) -> Result<SeriesTuple, AppError> {
    let rows = sqlx::query(
        "SELECT EXTRACT(ISODOW FROM date)::int AS dow,
                focus, stress, wellness
         FROM daily_eeg_records
         WHERE user_id = $1 AND date_trunc('week', date) = date_trunc('week', CURRENT_DATE)",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    let mut focus = vec![0.0; 7];
    let mut stress = vec![0.0; 7];
    let mut wellness = vec![0.0; 7];
    for row in rows {
        let dow: i32 = row.try_get("dow").map_err(eeg_core::map_db_error)?;
        if !(1..=7).contains(&dow) {
            continue;
        }
        let idx = (dow - 1) as usize;
        focus[idx] = row.try_get("focus").map_err(eeg_core::map_db_error)?;
        stress[idx] = row.try_get("stress").map_err(eeg_core::map_db_error)?;
        wellness[idx] = row.try_get("wellness").map_err(eeg_core::map_db_error)?;
    }
    let labels = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    Ok((labels, focus, stress, wellness))
}

/// 4 week-of-month buckets for the current month, grouping
/// `daily_eeg_records` by `week_of_month`. Falls back to the single
/// `monthly_eeg_records` average (repeated across all four buckets) once
/// `aggregate_monthly` has rolled the daily rows up and deleted them.
async fn monthly_series(state: &AppState, user_id: Uuid) -> Result<SeriesTuple, AppError> {
    let labels: Vec<String> = (1..=4).map(|w| format!("Week {w}")).collect();

    let rows = sqlx::query(
        "SELECT date, focus, stress, wellness
         FROM daily_eeg_records
         WHERE user_id = $1 AND date_trunc('month', date) = date_trunc('month', CURRENT_DATE)",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    let mut focus_sum = vec![0.0; 4];
    let mut stress_sum = vec![0.0; 4];
    let mut wellness_sum = vec![0.0; 4];
    let mut counts = vec![0u32; 4];
    for row in rows {
        let date: NaiveDate = row.try_get("date").map_err(eeg_core::map_db_error)?;
        let idx = week_of_month(date);
        focus_sum[idx] += row.try_get::<f64, _>("focus").map_err(eeg_core::map_db_error)?;
        stress_sum[idx] += row.try_get::<f64, _>("stress").map_err(eeg_core::map_db_error)?;
        wellness_sum[idx] += row.try_get::<f64, _>("wellness").map_err(eeg_core::map_db_error)?;
        counts[idx] += 1;
    }

    if counts.iter().all(|c| *c == 0) {
        if let Some(row) = sqlx::query(
            "SELECT focus, stress, wellness FROM monthly_eeg_records
             WHERE user_id = $1 AND year = EXTRACT(YEAR FROM CURRENT_DATE)::int
               AND month = EXTRACT(MONTH FROM CURRENT_DATE)::int",
        )
        .bind(user_id)
        .fetch_optional(&state.db)
        .await
        .map_err(eeg_core::map_db_error)?
        {
            let focus: f64 = row.try_get("focus").map_err(eeg_core::map_db_error)?;
            let stress: f64 = row.try_get("stress").map_err(eeg_core::map_db_error)?;
            let wellness: f64 = row.try_get("wellness").map_err(eeg_core::map_db_error)?;
            return Ok((labels, vec![focus; 4], vec![stress; 4], vec![wellness; 4]));
        }
        return Ok((labels, focus_sum, stress_sum, wellness_sum));
    }

    let focus: Vec<f64> = focus_sum.iter().zip(&counts).map(|(s, c)| if *c > 0 { s / *c as f64 } else { 0.0 }).collect();
    let stress: Vec<f64> = stress_sum.iter().zip(&counts).map(|(s, c)| if *c > 0 { s / *c as f64 } else { 0.0 }).collect();
    let wellness: Vec<f64> = wellness_sum.iter().zip(&counts).map(|(s, c)| if *c > 0 { s / *c as f64 } else { 0.0 }).collect();
    Ok((labels, focus, stress, wellness))
}

/// 12 month buckets, preferring `yearly_eeg_records` distribution; here
/// sourced directly from `monthly_eeg_records` for the current year.
async fn yearly_series(state: &AppState, user_id: Uuid) -> Result<SeriesTuple, AppError> {
    let rows = sqlx::query(
        "SELECT month, focus, stress, wellness FROM monthly_eeg_records
         WHERE user_id = $1 AND year = EXTRACT(YEAR FROM CURRENT_DATE)::int",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    let mut focus = vec![0.0; 12];
    let mut stress = vec![0.0; 12];
    let mut wellness = vec![0.0; 12];
    for row in rows {
        let month: i16 = row.try_get("month").map_err(eeg_core::map_db_error)?;
        if !(1..=12).contains(&month) {
            continue;
        }
        let idx = (month - 1) as usize;
        focus[idx] = row.try_get("focus").map_err(eeg_core::map_db_error)?;
        stress[idx] = row.try_get("stress").map_err(eeg_core::map_db_error)?;
        wellness[idx] = row.try_get("wellness").map_err(eeg_core::map_db_error)?;
    }
    let labels = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    Ok((labels, focus, stress, wellness))
}

/// One element per month over the trailing 90 days, aggregated directly
/// from `eeg_records` rather than a precomputed tier.
async fn quarterly_series(state: &AppState, user_id: Uuid) -> Result<SeriesTuple, AppError> {
    let rows = sqlx::query(
        "SELECT EXTRACT(YEAR FROM timestamp)::int AS year, EXTRACT(MONTH FROM timestamp)::int AS month,
                AVG(focus_label) AS focus, AVG(stress_label) AS stress, AVG(wellness_label) AS wellness
         FROM eeg_records
         WHERE user_id = $1 AND timestamp >= CURRENT_DATE - INTERVAL '90 days'
         GROUP BY year, month
         ORDER BY year, month",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    let mut labels = Vec::new();
    let mut focus = Vec::new();
    let mut stress = Vec::new();
    let mut wellness = Vec::new();
    for row in rows {
        let year: i32 = row.try_get("year").map_err(eeg_core::map_db_error)?;
        let month: i32 = row.try_get("month").map_err(eeg_core::map_db_error)?;
        labels.push(format!("{year}-{month:02}"));
        focus.push(row.try_get::<Option<f64>, _>("focus").map_err(eeg_core::map_db_error)?.unwrap_or(0.0));
        stress.push(row.try_get::<Option<f64>, _>("stress").map_err(eeg_core::map_db_error)?.unwrap_or(0.0));
        wellness.push(row.try_get::<Option<f64>, _>("wellness").map_err(eeg_core::map_db_error)?.unwrap_or(0.0));
    }
    Ok((labels, focus, stress, wellness))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/eeg/aggregate", get(range_series))
}
