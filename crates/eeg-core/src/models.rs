use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `eeg_records`: one row per (user, second) metric record.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EegRecordRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub focus_label: f64,
    pub stress_label: f64,
    pub wellness_label: f64,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

/// `daily_eeg_records`: unweighted daily mean per user, indexed (user_id, date).
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DailyEegRecordRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub focus: f64,
    pub stress: f64,
    pub wellness: f64,
}

/// `monthly_eeg_records`: unweighted monthly mean, indexed (user_id, year, month).
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MonthlyEegRecordRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub year: i32,
    pub month: i16,
    pub focus: f64,
    pub stress: f64,
    pub wellness: f64,
}

/// `yearly_eeg_records`: unweighted yearly mean, indexed (user_id, year).
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize, utoipa::ToSchema)]
pub struct YearlyEegRecordRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub year: i32,
    pub focus: f64,
    pub stress: f64,
    pub wellness: f64,
}

/// `eeg_records_backup`: archived copy of a consumed `EegRecordRow`,
/// written when a day's records are rolled into a `DailyEegRecordRow` and
/// the date being aggregated is strictly in the past.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EegRecordsBackupRow {
    pub id: Uuid,
    pub original_id: Uuid,
    pub user_id: Uuid,
    pub timestamp: NaiveDate,
    pub focus_label: f64,
    pub stress_label: f64,
    pub wellness_label: f64,
    pub backup_date: NaiveDate,
}

/// `sessions`: a user-labeled window of tracked activity with its
/// precomputed focus/stress/wellness means.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    pub duration: i64,
    pub label: String,
    pub focus: f64,
    pub stress: f64,
    pub wellness: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display labels derived from a scalar value per §4.4's thresholds.
pub fn focus_or_stress_label(value: f64) -> &'static str {
    if value >= 2.5 {
        "High"
    } else if value >= 1.5 {
        "Medium"
    } else {
        "Low"
    }
}

pub fn wellness_label(value: f64) -> &'static str {
    if value >= 70.0 {
        "Good"
    } else if value >= 40.0 {
        "Fair"
    } else {
        "Poor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_label_thresholds() {
        assert_eq!(focus_or_stress_label(2.5), "High");
        assert_eq!(focus_or_stress_label(1.5), "Medium");
        assert_eq!(focus_or_stress_label(0.0), "Low");
    }

    #[test]
    fn wellness_label_thresholds() {
        assert_eq!(wellness_label(70.0), "Good");
        assert_eq!(wellness_label(40.0), "Fair");
        assert_eq!(wellness_label(10.0), "Poor");
    }
}
