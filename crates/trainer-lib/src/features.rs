//! Feature engineering for attack classification
//!
//! Derives two columns from every attack record:
//! - `hour`: hour of day of the event timestamp
//! - `is_brute_force`: whether the targeted service is a brute-force target
//!
//! Both are pure functions of the source columns, so rebuilding features
//! from the same records always yields the same table.

use crate::error::{PipelineError, Result};
use crate::models::{AttackRecord, EventTime, FeatureVector};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use std::collections::BTreeSet;

/// Services whose attacks count as brute force by default
pub const DEFAULT_BRUTE_FORCE_SERVICES: [&str; 2] = ["ssh", "rdp"];

/// Naive timestamp layouts accepted for text columns, tried in order
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Features and labels derived from a batch of attack records, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<Option<String>>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Builds feature vectors from raw attack records
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    brute_force_services: BTreeSet<String>,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureBuilder {
    pub fn new() -> Self {
        Self::with_services(DEFAULT_BRUTE_FORCE_SERVICES)
    }

    pub fn with_services<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            brute_force_services: services.into_iter().map(Into::into).collect(),
        }
    }

    pub fn brute_force_services(&self) -> impl Iterator<Item = &str> {
        self.brute_force_services.iter().map(String::as_str)
    }

    /// Build the feature table. Any row that cannot be featurized fails the
    /// whole batch.
    pub fn build(&self, records: &[AttackRecord]) -> Result<FeatureTable> {
        let mut table = FeatureTable {
            features: Vec::with_capacity(records.len()),
            labels: Vec::with_capacity(records.len()),
        };

        for (row, record) in records.iter().enumerate() {
            table.features.push(self.extract(row, record)?);
            table.labels.push(record.attack_type.clone());
        }

        Ok(table)
    }

    /// Featurize a single record; `row` is only used for error reporting
    pub fn extract(&self, row: usize, record: &AttackRecord) -> Result<FeatureVector> {
        let timestamp = record.timestamp.as_ref().ok_or_else(|| PipelineError::Feature {
            row,
            reason: "missing timestamp".to_string(),
        })?;
        let service = record.service.as_deref().ok_or_else(|| PipelineError::Feature {
            row,
            reason: "missing service".to_string(),
        })?;

        let hour = hour_of(timestamp).map_err(|reason| PipelineError::Feature { row, reason })?;

        Ok(FeatureVector {
            hour,
            is_brute_force: self.is_brute_force(service),
        })
    }

    pub fn is_brute_force(&self, service: &str) -> u8 {
        u8::from(self.brute_force_services.contains(service))
    }
}

/// Hour of day for an event time
pub fn hour_of(time: &EventTime) -> std::result::Result<u32, String> {
    match time {
        EventTime::Parsed(dt) => Ok(dt.hour()),
        EventTime::Text(raw) => parse_timestamp_hour(raw),
    }
}

/// Parse a text timestamp and return its hour. Offsets are kept: the hour is
/// the wall-clock hour in the timestamp's own zone.
pub fn parse_timestamp_hour(raw: &str) -> std::result::Result<u32, String> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.hour());
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.hour());
        }
    }

    if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
        return Ok(0);
    }

    Err(format!("unparsable timestamp {:?}", raw))
}
