//! End-to-end training run
//!
//! Stages run strictly in order, each consuming the previous stage's full
//! output:
//!
//! ```text
//! load -> features -> split -> train -> evaluate -> persist -> publish
//! ```
//!
//! The data source and index sink are injected by the caller, which owns
//! their acquisition and release.


use crate::classifier::{AttackClassifier, Evaluation, ForestParams};
use crate::dataset::HoldoutSplit;
use crate::error::Result;
use crate::features::{FeatureBuilder, DEFAULT_BRUTE_FORCE_SERVICES};
use crate::loader::AttackSource;
use crate::models::{ArtifactInfo, AttackRecord, IndexReceipt, PredictionRecord};
use crate::observability::StructuredLogger;
use crate::persist::{ModelStore, DEFAULT_MODEL_PATH};
use crate::publish::{PredictionSink, DEFAULT_INDEX_NAME};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

const TRAINER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the publish stage sends to the index
#[derive(Debug, Clone, PartialEq)]
pub enum PublishMode {
    /// Static smoke-test document; not an inference result
    Sample,
    /// Run the fitted model on `probe` and publish its prediction
    Live { probe: AttackRecord },
}

impl Default for PublishMode {
    fn default() -> Self {
        PublishMode::Sample
    }
}

impl PublishMode {
    /// Live mode with the default probe: an ssh event at 03:00
    pub fn live_default() -> Self {
        PublishMode::Live {
            probe: AttackRecord::new("2024-01-01T03:00:00", "ssh", "unknown"),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub split: HoldoutSplit,
    pub forest: ForestParams,
    pub model_path: PathBuf,
    pub index_name: String,
    pub publish_mode: PublishMode,
    pub brute_force_services: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            split: HoldoutSplit::default(),
            forest: ForestParams::default(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            publish_mode: PublishMode::default(),
            brute_force_services: DEFAULT_BRUTE_FORCE_SERVICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub rows_loaded: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub labels: Vec<String>,
    pub evaluation: Evaluation,
    pub artifact: ArtifactInfo,
    pub published: PredictionRecord,
    pub receipt: IndexReceipt,
    pub live_prediction: bool,
}

/// Single-shot training pipeline
pub struct TrainingPipeline {
    config: PipelineConfig,
    features: FeatureBuilder,
    store: ModelStore,
    logger: StructuredLogger,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let run_id = format!("train-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S%3f"));
        Self::with_run_id(config, run_id)
    }

    pub fn with_run_id(config: PipelineConfig, run_id: impl Into<String>) -> Self {
        Self {
            features: FeatureBuilder::with_services(config.brute_force_services.iter().cloned()),
            store: ModelStore::new(config.model_path.clone()),
            logger: StructuredLogger::new(run_id),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run_id(&self) -> &str {
        self.logger.run_id()
    }

    /// Run every stage once. The first failing stage aborts the run.
    pub async fn run(
        &self,
        source: &mut dyn AttackSource,
        sink: &dyn PredictionSink,
    ) -> Result<PipelineReport> {
        let result = self.run_stages(source, sink).await;
        if let Err(e) = &result {
            self.logger.log_stage_failed(e);
        }
        result
    }

    async fn run_stages(
        &self,
        source: &mut dyn AttackSource,
        sink: &dyn PredictionSink,
    ) -> Result<PipelineReport> {
        let run_start = Instant::now();
        self.config.split.validate()?;
        self.config.forest.validate()?;

        self.logger.log_run_started(
            TRAINER_VERSION,
            &self.config.model_path.display().to_string(),
            &self.config.index_name,
        );

        // Load
        let start = Instant::now();
        let records = source.fetch_attacks().await?;
        let rows_loaded = records.len();
        self.logger
            .log_rows_loaded(rows_loaded, start.elapsed().as_millis());

        // Features
        let table = self.features.build(&records)?;
        drop(records);
        let brute_force_rows = table
            .features
            .iter()
            .filter(|f| f.is_brute_force == 1)
            .count();
        let unlabeled_rows = table.labels.iter().filter(|l| l.is_none()).count();
        self.logger
            .log_features_built(table.len(), brute_force_rows, unlabeled_rows);

        // Split
        let split = self.config.split.split(table)?;
        self.logger.log_split(
            split.train_len(),
            split.test_len(),
            self.config.split.test_fraction,
        );

        // Train
        let start = Instant::now();
        let model = AttackClassifier::fit(
            &self.config.forest,
            &split.train_features,
            &split.train_labels,
        )?;
        self.logger
            .log_model_trained(model.n_trees(), model.labels(), start.elapsed().as_millis());

        // Evaluate
        let evaluation = model.evaluate(&split.test_features, &split.test_labels)?;
        self.logger.log_evaluation(&evaluation);

        // Persist
        let artifact = self.store.save(&model)?;
        self.logger.log_model_persisted(&artifact);

        // Publish
        let (published, live_prediction) = self.prediction_to_publish(&model)?;
        let receipt = sink
            .index_document(&self.config.index_name, &published)
            .await?;
        self.logger.log_prediction_published(
            &self.config.index_name,
            &published,
            &receipt,
            live_prediction,
        );

        self.logger
            .log_run_finished(run_start.elapsed().as_millis());

        Ok(PipelineReport {
            run_id: self.run_id().to_string(),
            rows_loaded,
            train_rows: split.train_len(),
            test_rows: split.test_len(),
            labels: model.labels().to_vec(),
            evaluation,
            artifact,
            published,
            receipt,
            live_prediction,
        })
    }

    fn prediction_to_publish(&self, model: &AttackClassifier) -> Result<(PredictionRecord, bool)> {
        match &self.config.publish_mode {
            PublishMode::Sample => Ok((PredictionRecord::smoke_test(), false)),
            PublishMode::Live { probe } => {
                let features = self.features.extract(0, probe)?;
                Ok((model.predict(&features)?, true))
            }
        }
    }
}
