//! Train/test holdout split

use crate::error::{PipelineError, Result};
use crate::features::FeatureTable;
use crate::models::FeatureVector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Default fraction of rows held out for evaluation
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Holdout split configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HoldoutSplit {
    /// Fraction of rows assigned to the test subset, exclusive range (0, 1)
    pub test_fraction: f64,
    /// Shuffle seed; `None` draws a fresh one every run
    pub seed: Option<u64>,
}

impl Default for HoldoutSplit {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: None,
        }
    }
}

/// Train and test subsets with their labels
#[derive(Debug, Clone, Default)]
pub struct SplitDataset {
    pub train_features: Vec<FeatureVector>,
    pub test_features: Vec<FeatureVector>,
    pub train_labels: Vec<Option<String>>,
    pub test_labels: Vec<Option<String>>,
}

impl SplitDataset {
    pub fn train_len(&self) -> usize {
        self.train_features.len()
    }

    pub fn test_len(&self) -> usize {
        self.test_features.len()
    }
}

impl HoldoutSplit {
    pub fn new(test_fraction: f64) -> Self {
        Self {
            test_fraction,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::Config(format!(
                "test fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }

    /// Number of test rows for a dataset of `n` rows
    pub fn test_size(&self, n: usize) -> usize {
        (n as f64 * self.test_fraction).ceil() as usize
    }

    /// Randomly assign every row to exactly one subset
    pub fn split(&self, table: FeatureTable) -> Result<SplitDataset> {
        self.validate()?;

        let n = table.len();
        if n == 0 {
            return Err(PipelineError::Split("dataset is empty".to_string()));
        }

        let n_test = self.test_size(n);
        let n_train = n - n_test;
        if n_train == 0 {
            return Err(PipelineError::Split(format!(
                "{} rows with test fraction {} leaves no training rows",
                n, self.test_fraction
            )));
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);

        let mut out = SplitDataset {
            train_features: Vec::with_capacity(n_train),
            test_features: Vec::with_capacity(n_test),
            train_labels: Vec::with_capacity(n_train),
            test_labels: Vec::with_capacity(n_test),
        };

        let FeatureTable { features, mut labels } = table;
        for (position, &idx) in indices.iter().enumerate() {
            let label = labels[idx].take();
            if position < n_test {
                out.test_features.push(features[idx]);
                out.test_labels.push(label);
            } else {
                out.train_features.push(features[idx]);
                out.train_labels.push(label);
            }
        }

        Ok(out)
    }
}
