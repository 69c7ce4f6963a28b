//! Backward as-of join of volume samples onto plan intervals.
//!
//! Within each (location, direction, movement type) group a sample is matched
//! to the interval with the greatest `start <= timestamp`, and kept only if
//! `timestamp < end`. Samples without a covering plan are dropped.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::records::{AlignedSample, GroupKey, PlanInterval, VolumeSample};

/// Why a sample found no covering plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatch {
    /// No interval in the group starts at or before the sample.
    NoPrecedingPlan,
    /// The latest preceding interval ended at or before the sample.
    PastPlanEnd,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub no_preceding_plan: usize,
    pub past_plan_end: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.no_preceding_plan + self.past_plan_end
    }

    fn record(&mut self, reason: NoMatch) {
        match reason {
            NoMatch::NoPrecedingPlan => self.no_preceding_plan += 1,
            NoMatch::PastPlanEnd => self.past_plan_end += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    /// Ordered by timestamp, then by group key.
    pub rows: Vec<AlignedSample>,
    pub dropped: DropCounts,
}

#[derive(Default)]
struct Group {
    samples: Vec<VolumeSample>,
    plans: Vec<PlanInterval>,
}

/// Matches every sample against the plans of its own group.
///
/// Input order does not matter: both sides are re-sorted per group. When two
/// intervals share a start, the one appearing later in `plans` wins.
pub fn align(samples: Vec<VolumeSample>, plans: Vec<PlanInterval>) -> Alignment {
    let mut groups: BTreeMap<GroupKey, Group> = BTreeMap::new();
    for sample in samples {
        groups.entry(sample.key()).or_default().samples.push(sample);
    }
    for plan in plans {
        // Plans of groups without samples can never match anything.
        if let Some(group) = groups.get_mut(&plan.key()) {
            group.plans.push(plan);
        }
    }

    let mut out = Alignment::default();
    for (key, group) in groups {
        let before = out.rows.len();
        align_group(group, &mut out);
        debug!(
            location = %key.location_id,
            direction = %key.direction,
            movement = %key.movement_type,
            matched = out.rows.len() - before,
            "Aligned group"
        );
    }

    // Stable: rows of one group keep their key order at equal timestamps.
    out.rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    out
}

fn align_group(mut group: Group, out: &mut Alignment) {
    group.samples.sort_by_key(|s| s.timestamp);
    group.plans.sort_by_key(|p| p.start);

    for sample in group.samples {
        match find_plan(&group.plans, &sample) {
            Ok(plan) => out.rows.push(sample.aligned_with(plan)),
            Err(reason) => out.dropped.record(reason),
        }
    }
}

/// `plans` must be sorted by start.
fn find_plan<'a>(
    plans: &'a [PlanInterval],
    sample: &VolumeSample,
) -> Result<&'a PlanInterval, NoMatch> {
    let eligible = plans.partition_point(|p| p.start <= sample.timestamp);
    let plan = eligible
        .checked_sub(1)
        .map(|idx| &plans[idx])
        .ok_or(NoMatch::NoPrecedingPlan)?;

    if plan.covers(sample.timestamp) {
        Ok(plan)
    } else {
        Err(NoMatch::PastPlanEnd)
    }
}
