//! Structured logging for training runs
//!
//! Every pipeline stage emits one `tracing` event with an `event` field and
//! typed values, so JSON log output can be filtered per stage.

use crate::classifier::Evaluation;
use crate::error::PipelineError;
use crate::models::{ArtifactInfo, IndexReceipt, PredictionRecord};
use tracing::{error, info, warn};

/// Structured logger for pipeline events
#[derive(Clone)]
pub struct StructuredLogger {
    run_id: String,
}

impl StructuredLogger {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Log run startup
    pub fn log_run_started(&self, version: &str, model_path: &str, index: &str) {
        info!(
            event = "run_started",
            run_id = %self.run_id,
            trainer_version = %version,
            model_path = %model_path,
            index = %index,
            "Attack classifier training started"
        );
    }

    pub fn log_rows_loaded(&self, rows: usize, elapsed_ms: u128) {
        if rows == 0 {
            warn!(
                event = "rows_loaded",
                run_id = %self.run_id,
                rows = rows,
                elapsed_ms = elapsed_ms,
                "Attack table is empty"
            );
        } else {
            info!(
                event = "rows_loaded",
                run_id = %self.run_id,
                rows = rows,
                elapsed_ms = elapsed_ms,
                "Loaded attack rows"
            );
        }
    }

    pub fn log_features_built(&self, rows: usize, brute_force_rows: usize, unlabeled_rows: usize) {
        info!(
            event = "features_built",
            run_id = %self.run_id,
            rows = rows,
            brute_force_rows = brute_force_rows,
            unlabeled_rows = unlabeled_rows,
            "Derived hour and is_brute_force features"
        );
    }

    pub fn log_split(&self, train_rows: usize, test_rows: usize, test_fraction: f64) {
        info!(
            event = "dataset_split",
            run_id = %self.run_id,
            train_rows = train_rows,
            test_rows = test_rows,
            test_fraction = test_fraction,
            "Split dataset into train and test subsets"
        );
    }

    pub fn log_model_trained(&self, n_trees: usize, labels: &[String], elapsed_ms: u128) {
        info!(
            event = "model_trained",
            run_id = %self.run_id,
            n_trees = n_trees,
            classes = labels.len(),
            labels = ?labels,
            elapsed_ms = elapsed_ms,
            "Attack classifier fitted"
        );
    }

    pub fn log_evaluation(&self, evaluation: &Evaluation) {
        info!(
            event = "model_evaluated",
            run_id = %self.run_id,
            samples = evaluation.samples,
            correct = evaluation.correct,
            unlabeled = evaluation.unlabeled,
            accuracy = evaluation.accuracy,
            "Evaluated classifier on held-out rows"
        );
    }

    pub fn log_model_persisted(&self, artifact: &ArtifactInfo) {
        info!(
            event = "model_persisted",
            run_id = %self.run_id,
            path = %artifact.path.display(),
            size_bytes = artifact.size_bytes,
            checksum = %artifact.checksum,
            "Model written to disk"
        );
    }

    pub fn log_prediction_published(
        &self,
        index: &str,
        record: &PredictionRecord,
        receipt: &IndexReceipt,
        live: bool,
    ) {
        info!(
            event = "prediction_published",
            run_id = %self.run_id,
            index = %index,
            document_id = %receipt.id,
            attack_type = %record.attack_type,
            confidence = record.confidence,
            live = live,
            "Prediction document indexed"
        );
    }

    pub fn log_run_finished(&self, elapsed_ms: u128) {
        info!(
            event = "run_finished",
            run_id = %self.run_id,
            elapsed_ms = elapsed_ms,
            "Attack classifier training finished"
        );
    }

    pub fn log_stage_failed(&self, err: &PipelineError) {
        error!(
            event = "stage_failed",
            run_id = %self.run_id,
            stage = err.stage(),
            error = %err,
            "Training run aborted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("run-1");
        assert_eq!(logger.run_id(), "run-1");
    }

    #[test]
    fn test_logging_without_subscriber_is_noop() {
        let logger = StructuredLogger::new("run-2");
        logger.log_rows_loaded(0, 1);
        logger.log_split(8, 2, 0.2);
        logger.log_stage_failed(&PipelineError::Split("dataset is empty".into()));
    }
}
