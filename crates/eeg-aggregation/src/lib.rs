mod state_machine;

pub use state_machine::AggregationState;

fn log_state(user_id: Uuid, state: AggregationState) {
    tracing::debug!(%user_id, ?state, terminal = state.is_terminal(), "aggregation state transition");
}

use chrono::{Datelike, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Rolls `eeg_records` up into `daily_eeg_records` / `monthly_eeg_records` /
/// `yearly_eeg_records` per user, archiving and deleting the source tier
/// once the next tier up has been durably written (§4.3).
#[derive(Clone)]
pub struct AggregationEngine {
    pool: PgPool,
    poll_interval: Duration,
}

/// Outcome of one aggregation pass: how many user-slices were written vs.
/// how many failed independently (§4.3's per-user transaction isolation).
#[derive(Debug, Clone, Default)]
pub struct AggregationReport {
    pub written: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl AggregationReport {
    fn merge(&mut self, outcome: &AggregationOutcome) {
        match outcome {
            AggregationOutcome::Written => self.written += 1,
            AggregationOutcome::Skipped => self.skipped += 1,
            AggregationOutcome::Failed => self.failed += 1,
        }
    }
}

enum AggregationOutcome {
    Written,
    Skipped,
    Failed,
}

impl AggregationEngine {
    pub fn new(pool: PgPool, poll_interval: Duration) -> Self {
        AggregationEngine { pool, poll_interval }
    }

    /// Spawns the scheduled trigger loop: daily aggregation for yesterday
    /// (with same-day fallback) on every tick, followed by month/year
    /// rollover checks. The struct owns its deps, `start` consumes `self`
    /// and spawns, cancellation races the interval tick inside
    /// `tokio::select!`.
    pub fn start(self, cancel: CancellationToken) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.poll_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("aggregation engine shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(err) = self.tick().await {
                            tracing::warn!(error = %err, "aggregation tick failed");
                        }
                    }
                }
            }
        });
    }

    async fn tick(&self) -> anyhow::Result<()> {
        let today = Utc::now().date_naive();
        let yesterday = today - chrono::Duration::days(1);

        let report = self.aggregate_daily(yesterday, true).await?;
        tracing::info!(
            written = report.written,
            skipped = report.skipped,
            failed = report.failed,
            date = %yesterday,
            "daily aggregation tick complete"
        );

        if today.day() == 1 {
            let prev_month = yesterday;
            let report = self
                .aggregate_monthly(prev_month.year(), prev_month.month() as i16)
                .await?;
            tracing::info!(
                written = report.written,
                failed = report.failed,
                year = prev_month.year(),
                month = prev_month.month(),
                "monthly aggregation tick complete"
            );

            if prev_month.month() == 12 {
                let report = self.aggregate_yearly(prev_month.year()).await?;
                tracing::info!(
                    written = report.written,
                    failed = report.failed,
                    year = prev_month.year(),
                    "yearly aggregation tick complete"
                );
            }
        }

        Ok(())
    }

    /// For every user with `eeg_records` on `date`, upsert a
    /// `daily_eeg_records` row with the arithmetic mean of focus/stress/
    /// wellness rounded to 2dp. If `date` is strictly before today, the
    /// source rows are archived to `eeg_records_backup` and deleted. If
    /// no rows exist for `date` and `use_fallback` is true, the target is
    /// re-pointed at today (only if today has data); otherwise this is a
    /// no-op.
    pub async fn aggregate_daily(
        &self,
        date: NaiveDate,
        use_fallback: bool,
    ) -> anyhow::Result<AggregationReport> {
        let mut target_date = date;
        let mut users = self.users_with_daily_records(target_date).await?;

        if users.is_empty() && use_fallback {
            let today = Utc::now().date_naive();
            if today != target_date {
                let today_users = self.users_with_daily_records(today).await?;
                if !today_users.is_empty() {
                    target_date = today;
                    users = today_users;
                }
            }
        }

        let is_past = target_date < Utc::now().date_naive();
        let mut report = AggregationReport::default();
        for user_id in users {
            let outcome = self.aggregate_daily_for_user(user_id, target_date, is_past).await;
            match outcome {
                Ok(outcome) => report.merge(&outcome),
                Err(err) => {
                    tracing::warn!(error = %err, %user_id, date = %target_date, "daily aggregation failed for user");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn users_with_daily_records(&self, date: NaiveDate) -> anyhow::Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT DISTINCT user_id FROM eeg_records WHERE timestamp::date = $1",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|row| row.get("user_id")).collect())
    }

    async fn aggregate_daily_for_user(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        archive_and_delete: bool,
    ) -> anyhow::Result<AggregationOutcome> {
        log_state(user_id, AggregationState::Pending);
        let mut tx = self.pool.begin().await?;
        log_state(user_id, AggregationState::Computing);

        let row = sqlx::query(
            "SELECT AVG(focus_label) AS focus, AVG(stress_label) AS stress, AVG(wellness_label) AS wellness
             FROM eeg_records WHERE user_id = $1 AND timestamp::date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        let focus: f64 = row.try_get::<Option<f64>, _>("focus")?.unwrap_or(0.0);
        let stress: f64 = row.try_get::<Option<f64>, _>("stress")?.unwrap_or(0.0);
        let wellness: f64 = row.try_get::<Option<f64>, _>("wellness")?.unwrap_or(0.0);

        sqlx::query(
            "INSERT INTO daily_eeg_records (id, user_id, date, focus, stress, wellness)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id, date) DO UPDATE
             SET focus = EXCLUDED.focus, stress = EXCLUDED.stress, wellness = EXCLUDED.wellness",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(date)
        .bind(round2(focus))
        .bind(round2(stress))
        .bind(round2(wellness))
        .execute(&mut *tx)
        .await?;
        log_state(user_id, AggregationState::Written);

        if archive_and_delete {
            sqlx::query(
                "INSERT INTO eeg_records_backup (id, original_id, user_id, timestamp, focus_label, stress_label, wellness_label, backup_date)
                 SELECT gen_random_uuid(), id, user_id, timestamp::date, focus_label, stress_label, wellness_label, $2
                 FROM eeg_records WHERE user_id = $1 AND timestamp::date = $3",
            )
            .bind(user_id)
            .bind(Utc::now().date_naive())
            .bind(date)
            .execute(&mut *tx)
            .await?;
            log_state(user_id, AggregationState::Archived);

            sqlx::query("DELETE FROM eeg_records WHERE user_id = $1 AND timestamp::date = $2")
                .bind(user_id)
                .bind(date)
                .execute(&mut *tx)
                .await?;
            log_state(user_id, AggregationState::Cleaned);
        } else {
            log_state(user_id, AggregationState::Skipped);
        }

        tx.commit().await?;
        Ok(AggregationOutcome::Written)
    }

    /// For every user with `daily_eeg_records` in `(year, month)`, upsert
    /// a `monthly_eeg_records` row with their mean, then delete the
    /// consumed daily rows (already durable via the backup tier written
    /// at the daily step — see DESIGN.md Open Question #3).
    pub async fn aggregate_monthly(
        &self,
        year: i32,
        month: i16,
    ) -> anyhow::Result<AggregationReport> {
        let users: Vec<Uuid> = sqlx::query(
            "SELECT DISTINCT user_id FROM daily_eeg_records WHERE EXTRACT(YEAR FROM date) = $1 AND EXTRACT(MONTH FROM date) = $2",
        )
        .bind(year)
        .bind(month as i32)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| row.get("user_id"))
        .collect();

        let mut report = AggregationReport::default();
        for user_id in users {
            match self.aggregate_monthly_for_user(user_id, year, month).await {
                Ok(outcome) => report.merge(&outcome),
                Err(err) => {
                    tracing::warn!(error = %err, %user_id, year, month, "monthly aggregation failed for user");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn aggregate_monthly_for_user(
        &self,
        user_id: Uuid,
        year: i32,
        month: i16,
    ) -> anyhow::Result<AggregationOutcome> {
        log_state(user_id, AggregationState::Pending);
        let mut tx = self.pool.begin().await?;
        log_state(user_id, AggregationState::Computing);

        let row = sqlx::query(
            "SELECT AVG(focus) AS focus, AVG(stress) AS stress, AVG(wellness) AS wellness
             FROM daily_eeg_records
             WHERE user_id = $1 AND EXTRACT(YEAR FROM date) = $2 AND EXTRACT(MONTH FROM date) = $3",
        )
        .bind(user_id)
        .bind(year)
        .bind(month as i32)
        .fetch_one(&mut *tx)
        .await?;

        let focus: f64 = row.try_get::<Option<f64>, _>("focus")?.unwrap_or(0.0);
        let stress: f64 = row.try_get::<Option<f64>, _>("stress")?.unwrap_or(0.0);
        let wellness: f64 = row.try_get::<Option<f64>, _>("wellness")?.unwrap_or(0.0);

        sqlx::query(
            "INSERT INTO monthly_eeg_records (id, user_id, year, month, focus, stress, wellness)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (user_id, year, month) DO UPDATE
             SET focus = EXCLUDED.focus, stress = EXCLUDED.stress, wellness = EXCLUDED.wellness",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(year)
        .bind(month)
        .bind(round2(focus))
        .bind(round2(stress))
        .bind(round2(wellness))
        .execute(&mut *tx)
        .await?;
        log_state(user_id, AggregationState::Written);

        sqlx::query(
            "DELETE FROM daily_eeg_records WHERE user_id = $1 AND EXTRACT(YEAR FROM date) = $2 AND EXTRACT(MONTH FROM date) = $3",
        )
        .bind(user_id)
        .bind(year)
        .bind(month as i32)
        .execute(&mut *tx)
        .await?;
        log_state(user_id, AggregationState::Cleaned);

        tx.commit().await?;
        Ok(AggregationOutcome::Written)
    }

    /// For every user with `monthly_eeg_records` in `year`, upsert a
    /// `yearly_eeg_records` row. Monthly rows are retained afterward —
    /// there is no further tier above yearly to justify deleting them
    /// (see DESIGN.md Open Question #1).
    pub async fn aggregate_yearly(&self, year: i32) -> anyhow::Result<AggregationReport> {
        let users: Vec<Uuid> = sqlx::query(
            "SELECT DISTINCT user_id FROM monthly_eeg_records WHERE year = $1",
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| row.get("user_id"))
        .collect();

        let mut report = AggregationReport::default();
        for user_id in users {
            match self.aggregate_yearly_for_user(user_id, year).await {
                Ok(outcome) => report.merge(&outcome),
                Err(err) => {
                    tracing::warn!(error = %err, %user_id, year, "yearly aggregation failed for user");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn aggregate_yearly_for_user(
        &self,
        user_id: Uuid,
        year: i32,
    ) -> anyhow::Result<AggregationOutcome> {
        log_state(user_id, AggregationState::Pending);
        let mut tx = self.pool.begin().await?;
        log_state(user_id, AggregationState::Computing);

        let row = sqlx::query(
            "SELECT AVG(focus) AS focus, AVG(stress) AS stress, AVG(wellness) AS wellness
             FROM monthly_eeg_records WHERE user_id = $1 AND year = $2",
        )
        .bind(user_id)
        .bind(year)
        .fetch_one(&mut *tx)
        .await?;

        let focus: f64 = row.try_get::<Option<f64>, _>("focus")?.unwrap_or(0.0);
        let stress: f64 = row.try_get::<Option<f64>, _>("stress")?.unwrap_or(0.0);
        let wellness: f64 = row.try_get::<Option<f64>, _>("wellness")?.unwrap_or(0.0);

        sqlx::query(
            "INSERT INTO yearly_eeg_records (id, user_id, year, focus, stress, wellness)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id, year) DO UPDATE
             SET focus = EXCLUDED.focus, stress = EXCLUDED.stress, wellness = EXCLUDED.wellness",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(year)
        .bind(round2(focus))
        .bind(round2(stress))
        .bind(round2(wellness))
        .execute(&mut *tx)
        .await?;
        log_state(user_id, AggregationState::Written);
        log_state(user_id, AggregationState::Skipped);

        tx.commit().await?;
        Ok(AggregationOutcome::Written)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_rounds_to_two_decimal_places() {
        assert_eq!(round2(1.005), 1.0);
        assert_eq!(round2(1.2345), 1.23);
        assert_eq!(round2(1.236), 1.24);
    }
}
