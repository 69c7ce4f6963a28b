//! Turns a report document into flat volume and plan rows.
//!
//! Flattening is fail-soft per record: an entry that cannot be decoded is
//! skipped and reported as a [`FlattenIssue`], the rest of the document is
//! still processed.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::records::{PlanInterval, VolumeSample};
use crate::report::{ChartEntry, MovementEntry, PlanEntry, ReportDocument, VolumeEntry};
use crate::timestamp::parse_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Table,
    Charts,
}

/// A record skipped while flattening.
///
/// `entry` indexes the table/chart entry; `item` indexes the volume or plan
/// inside it, and is `None` when the whole entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlattenIssue {
    pub section: Section,
    pub entry: usize,
    pub item: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedReport {
    pub samples: Vec<VolumeSample>,
    pub plans: Vec<PlanInterval>,
    pub issues: Vec<FlattenIssue>,
}

impl FlattenedReport {
    pub fn extend(&mut self, other: FlattenedReport) {
        self.samples.extend(other.samples);
        self.plans.extend(other.plans);
        self.issues.extend(other.issues);
    }
}

/// Flattens the document returned for `location_id`.
///
/// Volume rows take the queried location id (table entries carry none);
/// plan rows take the location from their chart entry.
pub fn flatten(location_id: &str, doc: &ReportDocument) -> FlattenedReport {
    let mut out = FlattenedReport::default();

    for (entry_idx, raw) in doc.table.iter().enumerate() {
        let movement: MovementEntry = match decode(raw) {
            Ok(m) => m,
            Err(message) => {
                out.skip(Section::Table, entry_idx, None, message);
                continue;
            }
        };

        for (item_idx, raw_volume) in movement.volumes.iter().enumerate() {
            match volume_sample(location_id, &movement, raw_volume) {
                Ok(sample) => out.samples.push(sample),
                Err(message) => out.skip(Section::Table, entry_idx, Some(item_idx), message),
            }
        }
    }

    for (entry_idx, raw) in doc.charts.iter().enumerate() {
        let chart: ChartEntry = match decode(raw) {
            Ok(c) => c,
            Err(message) => {
                out.skip(Section::Charts, entry_idx, None, message);
                continue;
            }
        };

        for (item_idx, raw_plan) in chart.plans.iter().enumerate() {
            match plan_interval(&chart, raw_plan) {
                Ok(plan) => out.plans.push(plan),
                Err(message) => out.skip(Section::Charts, entry_idx, Some(item_idx), message),
            }
        }
    }

    out
}

impl FlattenedReport {
    fn skip(&mut self, section: Section, entry: usize, item: Option<usize>, message: String) {
        warn!(?section, entry, item, %message, "Skipping malformed report record");
        self.issues.push(FlattenIssue {
            section,
            entry,
            item,
            message,
        });
    }
}

fn decode<T: DeserializeOwned>(raw: &Value) -> Result<T, String> {
    T::deserialize(raw).map_err(|e| e.to_string())
}

fn volume_sample(
    location_id: &str,
    movement: &MovementEntry,
    raw: &Value,
) -> Result<VolumeSample, String> {
    let volume: VolumeEntry = decode(raw)?;
    let timestamp = parse_timestamp(&volume.timestamp).map_err(|e| e.to_string())?;

    Ok(VolumeSample {
        location_id: location_id.to_string(),
        direction: movement.direction.clone(),
        movement_type: movement.movement_type.clone(),
        timestamp,
        count: volume.value,
    })
}

fn plan_interval(chart: &ChartEntry, raw: &Value) -> Result<PlanInterval, String> {
    let plan: PlanEntry = decode(raw)?;
    let start = parse_timestamp(&plan.start).map_err(|e| e.to_string())?;
    let end = parse_timestamp(&plan.end).map_err(|e| e.to_string())?;

    Ok(PlanInterval {
        location_id: chart.location_identifier.clone(),
        location_description: chart.location_description.clone(),
        direction: chart.direction.clone(),
        movement_type: chart.movement_type.clone(),
        plan_number: plan.plan_number,
        plan_description: plan.plan_description,
        start,
        end,
    })
}
