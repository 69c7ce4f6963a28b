use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::records::AlignedSample;
use crate::summary::types::{AverageVolume, DailyTotal, TimeWindow, VolumeSummary};
use crate::summary::utility::mean_and_stddev;

type PlanKey = (String, String, String, String);

fn plan_key(row: &AlignedSample) -> PlanKey {
    (
        row.location_id.clone(),
        row.direction.clone(),
        row.movement_type.clone(),
        row.plan_description.clone(),
    )
}

/// Aggregates aligned samples inside `window` into daily totals and
/// multi-day averages.
///
/// Daily totals are ordered by date, then by (location, direction, movement
/// type, plan description); averages by that same key. A group is averaged
/// over the days on which it has at least one sample inside the window.
pub fn summarize(rows: &[AlignedSample], window: TimeWindow) -> VolumeSummary {
    let mut daily: BTreeMap<(NaiveDate, PlanKey), u64> = BTreeMap::new();

    let mut in_window = 0usize;
    for row in rows.iter().filter(|r| window.contains(r.timestamp.time())) {
        in_window += 1;
        *daily
            .entry((row.timestamp.date(), plan_key(row)))
            .or_default() += u64::from(row.count);
    }
    debug!(rows = rows.len(), in_window, "Filtered samples to time-of-day window");

    let mut per_plan: BTreeMap<PlanKey, Vec<u64>> = BTreeMap::new();
    let daily_totals: Vec<DailyTotal> = daily
        .into_iter()
        .map(|((date, key), total)| {
            per_plan.entry(key.clone()).or_default().push(total);
            let (location_id, direction, movement_type, plan_description) = key;
            DailyTotal {
                date,
                location_id,
                direction,
                movement_type,
                plan_description,
                total,
            }
        })
        .collect();

    let averages = per_plan
        .into_iter()
        .map(|((location_id, direction, movement_type, plan_description), totals)| {
            let (average, stddev) = mean_and_stddev(&totals);
            AverageVolume {
                location_id,
                direction,
                movement_type,
                plan_description,
                days: totals.len(),
                average,
                stddev,
            }
        })
        .collect();

    VolumeSummary {
        daily_totals,
        averages,
    }
}
