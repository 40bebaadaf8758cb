//! Period key derivation.
//!
//! Keys are plain strings so a new period simply starts a new counter:
//! daily `YYYY-MM-DD`, weekly `YYYY-Www` (ISO week-numbering year), monthly
//! `YYYY-MM`, yearly `YYYY`.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};

use microbadge_entity::quota::PeriodType;

/// Usage counter key of `period` containing `date`.
pub fn period_key(period: PeriodType, date: NaiveDate) -> String {
    match period {
        PeriodType::Daily => date.format("%Y-%m-%d").to_string(),
        PeriodType::Weekly => {
            let week = date.iso_week();
            format!("{:04}-W{:02}", week.year(), week.week())
        }
        PeriodType::Monthly => date.format("%Y-%m").to_string(),
        PeriodType::Yearly => format!("{:04}", date.year()),
    }
}

/// Calendar date of `now` on a wall clock at `offset`.
pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}
