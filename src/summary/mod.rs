//! Time-of-day aggregation of aligned volumes.
//!
//! Aligned samples falling inside a wall-clock window are summed per day and
//! plan, then averaged across days. Both steps are returned so callers can
//! chart or export either one.

pub mod aggregate;
pub mod types;
pub mod utility;

pub use aggregate::summarize;
pub use types::{AverageVolume, DailyTotal, TimeWindow, VolumeSummary};
