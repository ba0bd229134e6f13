//! Attack-type classifier
//!
//! A bagged ensemble of `linfa` decision trees: each tree is fit on a
//! bootstrap sample of the training rows and predictions are a majority
//! vote across trees.

mod evaluation;
mod forest;
mod labels;

pub use evaluation::{ClassScore, Evaluation};
pub use forest::{AttackClassifier, ForestParams, DEFAULT_N_TREES};
pub use labels::LabelEncoder;

use crate::error::{PipelineError, Result};
use crate::models::FeatureVector;
use ndarray::Array2;

/// Stack feature vectors into a model input matrix
fn to_records(features: &[FeatureVector]) -> Result<Array2<f64>> {
    let data: Vec<f64> = features.iter().flat_map(|f| f.as_row()).collect();
    Array2::from_shape_vec((features.len(), FeatureVector::COLUMNS.len()), data)
        .map_err(|e| PipelineError::Training(format!("invalid feature matrix: {}", e)))
}

/// Require a label on every row
fn require_labels(labels: &[Option<String>]) -> Result<Vec<&str>> {
    labels
        .iter()
        .enumerate()
        .map(|(row, label)| {
            label.as_deref().ok_or_else(|| {
                PipelineError::Training(format!("row {} has no attack_type label", row))
            })
        })
        .collect()
}
