//! Held-out evaluation of a fitted classifier

use super::AttackClassifier;
use crate::error::Result;
use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-class outcome on the evaluation subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    pub label: String,
    pub support: usize,
    pub correct: usize,
}

impl ClassScore {
    pub fn recall(&self) -> f64 {
        if self.support == 0 {
            0.0
        } else {
            self.correct as f64 / self.support as f64
        }
    }
}

/// Accuracy report for a labeled subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Labeled rows scored
    pub samples: usize,
    pub correct: usize,
    /// Rows skipped because they carry no label
    pub unlabeled: usize,
    pub accuracy: f64,
    pub per_class: Vec<ClassScore>,
}

impl AttackClassifier {
    /// Score predictions against known labels. Labels never seen in
    /// training count as misclassified; rows without a label are skipped
    /// and counted in `unlabeled`.
    pub fn evaluate(
        &self,
        features: &[FeatureVector],
        labels: &[Option<String>],
    ) -> Result<Evaluation> {
        let (scored, actual): (Vec<FeatureVector>, Vec<&str>) = features
            .iter()
            .zip(labels)
            .filter_map(|(f, label)| label.as_deref().map(|l| (*f, l)))
            .unzip();
        let unlabeled = features.len() - scored.len();
        let predictions = self.predict_batch(&scored)?;

        let mut per_class: BTreeMap<&str, ClassScore> = BTreeMap::new();
        let mut correct = 0;

        for (prediction, &actual) in predictions.iter().zip(&actual) {
            let hit = prediction.attack_type == actual;
            let score = per_class.entry(actual).or_insert_with(|| ClassScore {
                label: actual.to_string(),
                support: 0,
                correct: 0,
            });
            score.support += 1;
            if hit {
                score.correct += 1;
                correct += 1;
            }
        }

        let samples = predictions.len();
        Ok(Evaluation {
            samples,
            correct,
            unlabeled,
            accuracy: if samples == 0 {
                0.0
            } else {
                correct as f64 / samples as f64
            },
            per_class: per_class.into_values().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ForestParams;

    fn fv(hour: u32, is_brute_force: u8) -> FeatureVector {
        FeatureVector {
            hour,
            is_brute_force,
        }
    }

    fn model() -> AttackClassifier {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            features.push(fv(i % 4, 1));
            labels.push(Some("brute_force".to_string()));
            features.push(fv(16 + i % 4, 0));
            labels.push(Some("xss".to_string()));
        }
        let params = ForestParams {
            n_trees: 15,
            max_depth: None,
            seed: Some(3),
        };
        AttackClassifier::fit(&params, &features, &labels).unwrap()
    }

    #[test]
    fn test_perfect_accuracy_on_separable_holdout() {
        let model = model();
        let eval = model
            .evaluate(
                &[fv(1, 1), fv(17, 0)],
                &[Some("brute_force".into()), Some("xss".into())],
            )
            .unwrap();
        assert_eq!(eval.samples, 2);
        assert_eq!(eval.correct, 2);
        assert!((eval.accuracy - 1.0).abs() < f64::EPSILON);
        assert_eq!(eval.per_class.len(), 2);
        assert!(eval.per_class.iter().all(|c| (c.recall() - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_unseen_label_is_a_miss() {
        let model = model();
        let eval = model
            .evaluate(&[fv(1, 1)], &[Some("sql_injection".into())])
            .unwrap();
        assert_eq!(eval.correct, 0);
        assert_eq!(eval.accuracy, 0.0);
        assert_eq!(eval.per_class[0].label, "sql_injection");
        assert_eq!(eval.per_class[0].support, 1);
    }

    #[test]
    fn test_unlabeled_holdout_rows_skipped() {
        let model = model();
        let eval = model
            .evaluate(
                &[fv(1, 1), fv(17, 0), fv(2, 1)],
                &[Some("brute_force".into()), None, Some("brute_force".into())],
            )
            .unwrap();
        assert_eq!(eval.samples, 2);
        assert_eq!(eval.unlabeled, 1);
        assert_eq!(eval.correct, 2);
        assert_eq!(eval.per_class.len(), 1);
        assert_eq!(eval.per_class[0].support, 2);
    }

    #[test]
    fn test_all_unlabeled_holdout() {
        let eval = model().evaluate(&[fv(1, 1)], &[None]).unwrap();
        assert_eq!(eval.samples, 0);
        assert_eq!(eval.unlabeled, 1);
        assert_eq!(eval.accuracy, 0.0);
        assert!(eval.per_class.is_empty());
    }

    #[test]
    fn test_empty_holdout() {
        let eval = model().evaluate(&[], &[]).unwrap();
        assert_eq!(eval.samples, 0);
        assert_eq!(eval.accuracy, 0.0);
    }
}
