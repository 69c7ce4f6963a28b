//! Wire shape of a turning-movement-count report.
//!
//! The document keeps its entries as raw JSON values so that one malformed
//! entry can be skipped without rejecting the whole response.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A parsed report response.
///
/// Only a JSON object is accepted; a missing `table` or `charts` section is
/// read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct ReportDocument {
    pub table: Vec<Value>,
    pub charts: Vec<Value>,
}

impl TryFrom<Map<String, Value>> for ReportDocument {
    type Error = String;

    fn try_from(mut object: Map<String, Value>) -> Result<Self, Self::Error> {
        Ok(Self {
            table: section(&mut object, "table")?,
            charts: section(&mut object, "charts")?,
        })
    }
}

fn section(object: &mut Map<String, Value>, name: &str) -> Result<Vec<Value>, String> {
    match object.remove(name) {
        None => Ok(Vec::new()),
        Some(Value::Array(entries)) => Ok(entries),
        Some(other) => Err(format!("`{name}` must be an array, found {other}")),
    }
}

/// One row of the `table` section: a movement and its binned volumes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementEntry {
    pub direction: String,
    pub movement_type: String,
    pub volumes: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeEntry {
    pub timestamp: String,
    pub value: u32,
}

/// One entry of the `charts` section: a movement and its time-of-day plans.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub location_identifier: String,
    #[serde(default)]
    pub location_description: String,
    pub direction: String,
    pub movement_type: String,
    pub plans: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEntry {
    #[serde(deserialize_with = "integer_or_string")]
    pub plan_number: i64,
    #[serde(default)]
    pub plan_description: String,
    pub start: String,
    pub end: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Str(s) => s,
    })
}

fn integer_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Scalar::deserialize(deserializer)? {
        Scalar::Int(i) => Ok(i),
        Scalar::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("plan number '{s}' is not an integer"))),
        Scalar::Float(f) => Err(de::Error::custom(format!("plan number {f} is not an integer"))),
    }
}
