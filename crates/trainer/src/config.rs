//! Trainer configuration
//!
//! Sources, later overriding earlier: built-in defaults, an optional config
//! file, then `TRAINER_*` environment variables (`__` separates sections,
//! e.g. `TRAINER_DATABASE__HOST`).

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use trainer_lib::{
    dataset::DEFAULT_TEST_FRACTION,
    features::DEFAULT_BRUTE_FORCE_SERVICES,
    persist::DEFAULT_MODEL_PATH,
    publish::{DEFAULT_INDEX_ENDPOINT, DEFAULT_INDEX_NAME},
    AttackRecord, ForestParams, HoldoutSplit, PipelineConfig, PublishMode,
};
use url::Url;

const ENV_PREFIX: &str = "TRAINER";

/// Trainer configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub database: DatabaseConfig,
    pub training: TrainingConfig,
    pub model: ModelConfig,
    pub index: IndexConfig,
    pub publish: PublishConfig,
}

/// PostgreSQL connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual fields
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "shadownet".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Connection URL for the attack database
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let mut url = Url::parse(&format!("postgres://{}:{}/", self.host, self.port))
            .with_context(|| format!("invalid database host {:?}", self.host))?;
        url.set_path(&format!("/{}", self.dbname));
        url.set_username(&self.user)
            .map_err(|_| anyhow!("cannot set database user on {}", url))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| anyhow!("cannot set database password"))?;
        }
        Ok(url.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub test_fraction: f64,
    /// Seed for both the split shuffle and the bootstrap samples
    pub seed: Option<u64>,
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub brute_force_services: Vec<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let forest = ForestParams::default();
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: None,
            n_trees: forest.n_trees,
            max_depth: forest.max_depth,
            brute_force_services: DEFAULT_BRUTE_FORCE_SERVICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub endpoint: String,
    pub name: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_INDEX_ENDPOINT.to_string(),
            name: DEFAULT_INDEX_NAME.to_string(),
        }
    }
}

/// Controls the document sent to the index after training
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Publish the model's prediction for the probe instead of the sample document
    pub live: bool,
    pub probe_timestamp: String,
    pub probe_service: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            live: false,
            probe_timestamp: "2024-01-01T03:00:00".to_string(),
            probe_service: "ssh".to_string(),
        }
    }
}

impl PublishConfig {
    pub fn mode(&self) -> PublishMode {
        if self.live {
            PublishMode::Live {
                probe: AttackRecord::new(
                    self.probe_timestamp.clone(),
                    self.probe_service.clone(),
                    "unknown",
                ),
            }
        } else {
            PublishMode::Sample
        }
    }
}

impl TrainerConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("training.brute_force_services"),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Pipeline settings derived from this configuration
    pub fn pipeline_config(&self) -> PipelineConfig {
        let split = HoldoutSplit {
            test_fraction: self.training.test_fraction,
            seed: self.training.seed,
        };
        let forest = ForestParams {
            n_trees: self.training.n_trees,
            max_depth: self.training.max_depth,
            seed: self.training.seed,
        };

        PipelineConfig {
            split,
            forest,
            model_path: self.model.path.clone(),
            index_name: self.index.name.clone(),
            publish_mode: self.publish.mode(),
            brute_force_services: self.training.brute_force_services.clone(),
        }
    }
}
