//! Data types produced by the aggregation step.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

/// Inclusive wall-clock window, e.g. `07:00..=09:00`.
///
/// A window whose start is after its end wraps midnight (`22:00..=02:00`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// The whole day.
    pub fn all_day() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= t && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }
}

/// Summed volume of one movement under one plan on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    pub date: NaiveDate,
    #[serde(rename = "locationIdentifier")]
    pub location_id: String,
    pub direction: String,
    pub movement_type: String,
    pub plan_description: String,
    pub total: u64,
}

/// Daily totals of one movement under one plan, averaged across days.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageVolume {
    #[serde(rename = "locationIdentifier")]
    pub location_id: String,
    pub direction: String,
    pub movement_type: String,
    pub plan_description: String,
    pub days: usize,
    pub average: f64,
    pub stddev: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeSummary {
    pub daily_totals: Vec<DailyTotal>,
    pub averages: Vec<AverageVolume>,
}
