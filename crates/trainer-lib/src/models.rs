//! Core data models for the attack classifier trainer

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp of an attack event as it came out of the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventTime {
    /// Already decoded by the database driver (TIMESTAMP / TIMESTAMPTZ)
    Parsed(NaiveDateTime),
    /// Text column, parsed by the feature builder
    Text(String),
}

/// One historical attack observation from the `attacks` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackRecord {
    pub timestamp: Option<EventTime>,
    pub service: Option<String>,
    pub attack_type: Option<String>,
}

impl AttackRecord {
    /// Build a record from a text timestamp
    pub fn new(
        timestamp: impl Into<String>,
        service: impl Into<String>,
        attack_type: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Some(EventTime::Text(timestamp.into())),
            service: Some(service.into()),
            attack_type: Some(attack_type.into()),
        }
    }
}

/// Engineered features for a single attack record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Hour of day, 0-23
    pub hour: u32,
    /// 1 when the service is a brute-force target, else 0
    pub is_brute_force: u8,
}

impl FeatureVector {
    /// Column names in model input order
    pub const COLUMNS: [&'static str; 2] = ["hour", "is_brute_force"];

    pub fn as_row(&self) -> [f64; 2] {
        [self.hour as f64, self.is_brute_force as f64]
    }
}

/// Prediction document written to the index service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub attack_type: String,
    pub confidence: f64,
}

impl PredictionRecord {
    /// Hand-authored smoke-test document. Not produced by the model.
    pub fn smoke_test() -> Self {
        Self {
            attack_type: "brute_force".to_string(),
            confidence: 0.95,
        }
    }
}

/// Acknowledgement returned by the index service for a written document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReceipt {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub result: Option<String>,
}

/// Written model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub path: std::path::PathBuf,
    pub size_bytes: u64,
    pub checksum: String,
}
