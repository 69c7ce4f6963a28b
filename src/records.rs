//! Flat row types produced from report documents.

use chrono::NaiveDateTime;
use serde::Serialize;

/// Join key shared by volume samples and plan intervals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub location_id: String,
    pub direction: String,
    pub movement_type: String,
}

/// Count for one movement over one bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSample {
    pub location_id: String,
    pub direction: String,
    pub movement_type: String,
    pub timestamp: NaiveDateTime,
    pub count: u32,
}

/// A time-of-day plan active on one movement over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanInterval {
    pub location_id: String,
    pub location_description: String,
    pub direction: String,
    pub movement_type: String,
    pub plan_number: i64,
    pub plan_description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// A volume sample annotated with the plan covering its timestamp.
///
/// Field order is the column order of exported datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignedSample {
    #[serde(rename = "locationIdentifier")]
    pub location_id: String,
    pub direction: String,
    pub movement_type: String,
    pub timestamp: NaiveDateTime,
    pub count: u32,
    pub plan_number: i64,
    pub plan_description: String,
    pub location_description: String,
}

impl VolumeSample {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            location_id: self.location_id.clone(),
            direction: self.direction.clone(),
            movement_type: self.movement_type.clone(),
        }
    }

    pub(crate) fn aligned_with(self, plan: &PlanInterval) -> AlignedSample {
        AlignedSample {
            location_id: self.location_id,
            direction: self.direction,
            movement_type: self.movement_type,
            timestamp: self.timestamp,
            count: self.count,
            plan_number: plan.plan_number,
            plan_description: plan.plan_description.clone(),
            location_description: plan.location_description.clone(),
        }
    }
}

impl PlanInterval {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            location_id: self.location_id.clone(),
            direction: self.direction.clone(),
            movement_type: self.movement_type.clone(),
        }
    }

    pub fn covers(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts < self.end
    }
}

impl AlignedSample {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            location_id: self.location_id.clone(),
            direction: self.direction.clone(),
            movement_type: self.movement_type.clone(),
        }
    }
}
