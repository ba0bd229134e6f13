//! Bagged decision-tree ensemble

use super::{require_labels, to_records, LabelEncoder};
use crate::error::{PipelineError, Result};
use crate::models::{FeatureVector, PredictionRecord};
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Number of trees when not configured
pub const DEFAULT_N_TREES: usize = 100;

/// Ensemble hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Maximum tree depth; `None` grows trees until leaves are pure
    pub max_depth: Option<usize>,
    /// Bootstrap seed; `None` draws a fresh one every fit
    pub seed: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_N_TREES,
            max_depth: None,
            seed: None,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(PipelineError::Config("n_trees must be at least 1".into()));
        }
        if self.max_depth == Some(0) {
            return Err(PipelineError::Config("max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

/// Fitted attack-type classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackClassifier {
    encoder: LabelEncoder,
    trees: Vec<DecisionTree<f64, usize>>,
    params: ForestParams,
    feature_columns: Vec<String>,
    n_train_samples: usize,
    trained_at: i64,
}

impl AttackClassifier {
    /// Fit the ensemble on labeled feature rows.
    ///
    /// Fails when any row is unlabeled or fewer than two distinct attack
    /// types are present.
    pub fn fit(
        params: &ForestParams,
        features: &[FeatureVector],
        labels: &[Option<String>],
    ) -> Result<Self> {
        params.validate()?;

        if features.len() != labels.len() {
            return Err(PipelineError::Training(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if features.is_empty() {
            return Err(PipelineError::Training("no training rows".into()));
        }

        let labels = require_labels(labels)?;
        let encoder = LabelEncoder::fit(labels.iter().copied());
        if encoder.len() < 2 {
            return Err(PipelineError::Training(format!(
                "need at least 2 distinct attack types, found {}",
                encoder.len()
            )));
        }

        let targets: Vec<usize> = labels
            .iter()
            .map(|label| {
                encoder.encode(label).ok_or_else(|| {
                    PipelineError::Training(format!("label {:?} missing from vocabulary", label))
                })
            })
            .collect::<Result<_>>()?;
        let records = to_records(features)?;

        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let start = Instant::now();
        let n = features.len();
        let mut trees = Vec::with_capacity(params.n_trees);

        for tree_idx in 0..params.n_trees {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let x = records.select(Axis(0), &sample);
            let y: Array1<usize> = sample.iter().map(|&i| targets[i]).collect();
            let dataset = DatasetBase::new(x, y);

            let tree = DecisionTree::<f64, usize>::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(params.max_depth)
                .fit(&dataset)
                .map_err(|e| PipelineError::Training(format!("tree {}: {}", tree_idx, e)))?;
            trees.push(tree);
        }

        debug!(
            trees = trees.len(),
            classes = encoder.len(),
            samples = n,
            elapsed_ms = start.elapsed().as_millis(),
            "Ensemble fitted"
        );

        Ok(Self {
            encoder,
            trees,
            params: params.clone(),
            feature_columns: FeatureVector::COLUMNS.iter().map(|c| c.to_string()).collect(),
            n_train_samples: n,
            trained_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Predict the attack type of a single feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionRecord> {
        self.predict_batch(std::slice::from_ref(features))?
            .pop()
            .ok_or_else(|| PipelineError::Training("model produced no prediction".into()))
    }

    /// Predict every row. Confidence is the winning label's share of tree
    /// votes; ties resolve to the label that sorts first.
    pub fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<PredictionRecord>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let records = to_records(features)?;
        let mut votes = vec![vec![0usize; self.encoder.len()]; features.len()];

        for tree in &self.trees {
            let predicted: Array1<usize> = tree.predict(&records);
            for (row, &class) in predicted.iter().enumerate() {
                if let Some(count) = votes[row].get_mut(class) {
                    *count += 1;
                }
            }
        }

        let n_trees = self.trees.len().max(1) as f64;
        votes
            .into_iter()
            .map(|counts| {
                let (class, best) = counts
                    .iter()
                    .enumerate()
                    .fold((0, 0), |acc, (class, &count)| {
                        if count > acc.1 {
                            (class, count)
                        } else {
                            acc
                        }
                    });
                let attack_type = self.encoder.decode(class).ok_or_else(|| {
                    PipelineError::Training(format!("class index {} out of range", class))
                })?;
                Ok(PredictionRecord {
                    attack_type: attack_type.to_string(),
                    confidence: best as f64 / n_trees,
                })
            })
            .collect()
    }

    /// Known attack types, sorted
    pub fn labels(&self) -> &[String] {
        self.encoder.labels()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn n_train_samples(&self) -> usize {
        self.n_train_samples
    }

    /// Unix timestamp of the fit
    pub fn trained_at(&self) -> i64 {
        self.trained_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(hour: u32, is_brute_force: u8) -> FeatureVector {
        FeatureVector {
            hour,
            is_brute_force,
        }
    }

    /// Night-time ssh/rdp rows are brute force, daytime web rows are port scans
    fn separable_rows() -> (Vec<FeatureVector>, Vec<Option<String>>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            features.push(fv(i % 6, 1));
            labels.push(Some("brute_force".to_string()));
            features.push(fv(12 + i % 6, 0));
            labels.push(Some("port_scan".to_string()));
        }
        (features, labels)
    }

    fn seeded(n_trees: usize) -> ForestParams {
        ForestParams {
            n_trees,
            max_depth: None,
            seed: Some(17),
        }
    }

    #[test]
    fn test_fit_and_predict_separable_classes() {
        let (features, labels) = separable_rows();
        let model = AttackClassifier::fit(&seeded(25), &features, &labels).unwrap();

        assert_eq!(model.n_trees(), 25);
        assert_eq!(model.labels(), ["brute_force", "port_scan"]);
        assert_eq!(model.n_train_samples(), 60);

        let p = model.predict(&fv(3, 1)).unwrap();
        assert_eq!(p.attack_type, "brute_force");
        assert!(p.confidence > 0.5 && p.confidence <= 1.0);

        let p = model.predict(&fv(14, 0)).unwrap();
        assert_eq!(p.attack_type, "port_scan");
    }

    #[test]
    fn test_single_class_rejected() {
        let features = vec![fv(1, 1), fv(2, 1)];
        let labels = vec![Some("brute_force".into()), Some("brute_force".into())];
        let err = AttackClassifier::fit(&seeded(5), &features, &labels).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn test_unlabeled_row_rejected() {
        let features = vec![fv(1, 1), fv(2, 0)];
        let labels = vec![Some("brute_force".into()), None];
        let err = AttackClassifier::fit(&seeded(5), &features, &labels).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_empty_training_set_rejected() {
        let err = AttackClassifier::fit(&seeded(5), &[], &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn test_zero_trees_rejected() {
        let (features, labels) = separable_rows();
        let err = AttackClassifier::fit(&seeded(0), &features, &labels).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_batch_prediction_matches_single() {
        let (features, labels) = separable_rows();
        let model = AttackClassifier::fit(&seeded(10), &features, &labels).unwrap();
        let probes = [fv(2, 1), fv(15, 0), fv(23, 1)];
        let batch = model.predict_batch(&probes).unwrap();
        assert_eq!(batch.len(), 3);
        for (probe, expected) in probes.iter().zip(&batch) {
            assert_eq!(&model.predict(probe).unwrap(), expected);
        }
        assert!(model.predict_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_default_params() {
        let params = ForestParams::default();
        assert_eq!(params.n_trees, 100);
        assert_eq!(params.max_depth, None);
        assert!(params.seed.is_none());
    }
}
