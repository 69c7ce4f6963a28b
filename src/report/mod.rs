//! The report-client boundary: one time-bounded query per (location, day).

mod atspm;
mod document;

pub use atspm::AtspmClient;
pub use document::{ChartEntry, MovementEntry, PlanEntry, ReportDocument, VolumeEntry};

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::error::ReportError;

/// A single time-bounded report query for one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub location_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub bin_size_minutes: u32,
}

impl ReportQuery {
    /// Query covering `[date 00:00, date+1 00:00)`.
    pub fn for_day(location_id: &str, date: NaiveDate, bin_size_minutes: u32) -> Self {
        let start = date.and_time(chrono::NaiveTime::MIN);
        let end = date
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(chrono::NaiveTime::MIN))
            .unwrap_or(NaiveDateTime::MAX);
        Self {
            location_id: location_id.to_string(),
            start,
            end,
            bin_size_minutes,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }
}

/// Abstraction over a source of report documents (the ATSPM API, a fixture...).
#[async_trait]
pub trait ReportClient: Send + Sync {
    /// Fetches the turning-movement report for `query`.
    async fn query(&self, query: &ReportQuery) -> Result<ReportDocument, ReportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_day_spans_midnight_to_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 6).unwrap();
        let q = ReportQuery::for_day("7115", date, 5);

        assert_eq!(q.start.to_string(), "2024-11-06 00:00:00");
        assert_eq!(q.end.to_string(), "2024-11-07 00:00:00");
        assert_eq!(q.date(), date);
    }

    #[test]
    fn test_for_day_crosses_month_end() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let q = ReportQuery::for_day("7115", date, 15);

        assert_eq!(q.end.to_string(), "2025-01-01 00:00:00");
        assert_eq!(q.bin_size_minutes, 15);
    }
}
