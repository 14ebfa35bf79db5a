//! Derived time-series datum

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// How a datum property behaves over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatumClassification {
    /// A point-in-time sample (power, voltage, temperature)
    Instantaneous,
    /// A monotonically growing register (energy)
    Accumulating,
}

/// A timestamped, named-property record derived from one or more readings
/// sharing the same timestamp and resolved source id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Datum {
    pub timestamp: DateTime<Utc>,
    pub source_id: String,
    /// Monitored asset the owning charge point reports under
    pub node_id: i64,
    pub instantaneous: BTreeMap<String, Decimal>,
    pub accumulating: BTreeMap<String, Decimal>,
    pub status: BTreeMap<String, String>,
}

impl Datum {
    pub fn new(timestamp: DateTime<Utc>, source_id: impl Into<String>, node_id: i64) -> Self {
        Self {
            timestamp,
            source_id: source_id.into(),
            node_id,
            instantaneous: BTreeMap::new(),
            accumulating: BTreeMap::new(),
            status: BTreeMap::new(),
        }
    }

    pub fn put(
        &mut self,
        classification: DatumClassification,
        name: impl Into<String>,
        value: Decimal,
    ) {
        match classification {
            DatumClassification::Instantaneous => self.instantaneous.insert(name.into(), value),
            DatumClassification::Accumulating => self.accumulating.insert(name.into(), value),
        };
    }

    pub fn put_status(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.status.insert(name.into(), value.into());
    }

    /// Numeric property lookup across both classifications.
    pub fn property(&self, name: &str) -> Option<Decimal> {
        self.instantaneous
            .get(name)
            .or_else(|| self.accumulating.get(name))
            .copied()
    }

    pub fn status_property(&self, name: &str) -> Option<&str> {
        self.status.get(name).map(String::as_str)
    }

    /// Whether the datum carries no numeric properties.
    pub fn is_empty(&self) -> bool {
        self.instantaneous.is_empty() && self.accumulating.is_empty()
    }
}
