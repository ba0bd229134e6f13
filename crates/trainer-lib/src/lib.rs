//! Attack classifier training library
//!
//! This crate provides the core functionality for:
//! - Loading historical attack records from PostgreSQL
//! - Feature derivation (hour of day, brute-force service flag)
//! - Holdout splitting and ensemble training
//! - Model persistence and prediction publishing
//! - Structured logging of every pipeline stage

pub mod classifier;
pub mod dataset;
pub mod error;
pub mod features;
pub mod loader;
pub mod models;
pub mod observability;
pub mod persist;
pub mod pipeline;
pub mod publish;

pub use classifier::{AttackClassifier, Evaluation, ForestParams};
pub use dataset::HoldoutSplit;
pub use error::{PipelineError, Result};
pub use features::FeatureBuilder;
pub use loader::{AttackSource, MemorySource, PgAttackSource};
pub use models::*;
pub use observability::StructuredLogger;
pub use persist::ModelStore;
pub use pipeline::{PipelineConfig, PipelineReport, PublishMode, TrainingPipeline};
pub use publish::{ElasticsearchClient, PredictionSink};
