use chrono::{Datelike, NaiveDate};

/// Week-of-month bucket, clamped to `[0, 3]` so a trailing partial fifth
/// week folds into week 4 rather than producing a 5-element result.
pub fn week_of_month(date: NaiveDate) -> usize {
    (((date.day() - 1) / 7) as usize).min(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDayBucket {
    Morning,
    Midday,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDayBucket {
    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDayBucket::Morning => "Morning",
            TimeOfDayBucket::Midday => "Midday",
            TimeOfDayBucket::Afternoon => "Afternoon",
            TimeOfDayBucket::Evening => "Evening",
            TimeOfDayBucket::Night => "Night",
        }
    }

    pub fn all() -> [TimeOfDayBucket; 5] {
        [
            TimeOfDayBucket::Morning,
            TimeOfDayBucket::Midday,
            TimeOfDayBucket::Afternoon,
            TimeOfDayBucket::Evening,
            TimeOfDayBucket::Night,
        ]
    }

    /// Buckets per §4.5: Morning 05-09, Midday 10-13, Afternoon 14-17,
    /// Evening 18-21, Night 22-04 (wraps past midnight).
    pub fn from_hour(hour: usize) -> TimeOfDayBucket {
        match hour {
            5..=9 => TimeOfDayBucket::Morning,
            10..=13 => TimeOfDayBucket::Midday,
            14..=17 => TimeOfDayBucket::Afternoon,
            18..=21 => TimeOfDayBucket::Evening,
            _ => TimeOfDayBucket::Night,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn week_of_month_clamps_fifth_week() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert_eq!(week_of_month(d), 3);
    }

    #[test]
    fn week_of_month_first_week() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(week_of_month(d), 0);
    }

    #[test]
    fn time_of_day_bucket_boundaries() {
        assert_eq!(TimeOfDayBucket::from_hour(5), TimeOfDayBucket::Morning);
        assert_eq!(TimeOfDayBucket::from_hour(9), TimeOfDayBucket::Morning);
        assert_eq!(TimeOfDayBucket::from_hour(10), TimeOfDayBucket::Midday);
        assert_eq!(TimeOfDayBucket::from_hour(22), TimeOfDayBucket::Night);
        assert_eq!(TimeOfDayBucket::from_hour(2), TimeOfDayBucket::Night);
    }
}
