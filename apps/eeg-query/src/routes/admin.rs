use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Datelike, NaiveDate, Utc};
use eeg_aggregation::AggregationReport;
use eeg_core::AppError;
use serde::{Deserialize, Serialize};
use sqlx::Row;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TriggerDailyRequest {
    /// Target date. Defaults to yesterday (with same-day fallback) when
    /// omitted, matching the scheduled tick.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Manual trigger for the daily aggregation pass. With no body (or an
/// absent `date`), covers yesterday with same-day fallback, mirroring
/// what the scheduled tick does on its own; an explicit `date` is run as
/// given, with no fallback.
async fn trigger_daily(
    State(state): State<AppState>,
    Json(body): Json<TriggerDailyRequest>,
) -> Result<Json<AggregationReport>, AppError> {
    let (date, use_fallback) = match body.date {
        Some(date) => (date, false),
        None => (Utc::now().date_naive() - chrono::Duration::days(1), true),
    };
    let report = state
        .aggregation
        .aggregate_daily(date, use_fallback)
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TriggerMonthlyRequest {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<i16>,
}

async fn trigger_monthly(
    State(state): State<AppState>,
    Json(body): Json<TriggerMonthlyRequest>,
) -> Result<Json<AggregationReport>, AppError> {
    let (year, month) = match (body.year, body.month) {
        (Some(year), Some(month)) => (year, month),
        _ => {
            let today = Utc::now().date_naive();
            let prev_month = today.with_day(1).unwrap() - chrono::Duration::days(1);
            (prev_month.year(), prev_month.month() as i16)
        }
    };
    let report = state
        .aggregation
        .aggregate_monthly(year, month)
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct TriggerYearlyRequest {
    #[serde(default)]
    pub year: Option<i32>,
}

async fn trigger_yearly(
    State(state): State<AppState>,
    Json(body): Json<TriggerYearlyRequest>,
) -> Result<Json<AggregationReport>, AppError> {
    let year = body.year.unwrap_or_else(|| Utc::now().date_naive().year() - 1);
    let report = state
        .aggregation
        .aggregate_yearly(year)
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    Ok(Json(report))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AggregationStatus {
    pub raw_records: i64,
    pub daily_records: i64,
    pub monthly_records: i64,
    pub yearly_records: i64,
    pub backup_records: i64,
}

async fn status(State(state): State<AppState>) -> Result<Json<AggregationStatus>, AppError> {
    let row = sqlx::query(
        "SELECT
            (SELECT COUNT(*) FROM eeg_records) AS raw_records,
            (SELECT COUNT(*) FROM daily_eeg_records) AS daily_records,
            (SELECT COUNT(*) FROM monthly_eeg_records) AS monthly_records,
            (SELECT COUNT(*) FROM yearly_eeg_records) AS yearly_records,
            (SELECT COUNT(*) FROM eeg_records_backup) AS backup_records",
    )
    .fetch_one(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;

    Ok(Json(AggregationStatus {
        raw_records: row.try_get("raw_records").map_err(eeg_core::map_db_error)?,
        daily_records: row.try_get("daily_records").map_err(eeg_core::map_db_error)?,
        monthly_records: row.try_get("monthly_records").map_err(eeg_core::map_db_error)?,
        yearly_records: row.try_get("yearly_records").map_err(eeg_core::map_db_error)?,
        backup_records: row.try_get("backup_records").map_err(eeg_core::map_db_error)?,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/aggregation/daily", post(trigger_daily))
        .route("/admin/aggregation/monthly", post(trigger_monthly))
        .route("/admin/aggregation/yearly", post(trigger_yearly))
        .route("/admin/aggregation/status", get(status))
}
