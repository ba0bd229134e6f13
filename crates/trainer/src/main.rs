//! Attack Trainer - honeypot attack-type classifier
//!
//! Trains the ensemble classifier on the historical `attacks` table,
//! persists it and indexes a prediction document for the dashboards.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trainer_lib::{
    AttackRecord, ElasticsearchClient, EventTime, FeatureBuilder, ModelStore, PgAttackSource,
    TrainingPipeline,
};

mod config;
mod output;

use config::TrainerConfig;
use output::{print_error, OutputFormat};

/// Attack classifier trainer
#[derive(Parser)]
#[command(name = "attack-trainer")]
#[command(author, version, about = "Train the honeypot attack-type classifier", long_about = None)]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(long, short, env = "TRAINER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train, persist and publish the classifier
    Train {
        /// Where to write the model artifact
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Seed for the split and bootstrap sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Publish the model's prediction for the probe event instead of
        /// the sample document
        #[arg(long)]
        live: bool,
    },

    /// Predict the attack type of a single event with a saved model
    Predict {
        /// Event timestamp (RFC 3339 or `YYYY-MM-DD HH:MM:SS`)
        #[arg(long)]
        timestamp: String,

        /// Targeted service (e.g. ssh, rdp, http)
        #[arg(long)]
        service: String,

        /// Model artifact to load
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Show metadata of a saved model
    Inspect {
        /// Model artifact to load
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    // JSON logs go to stderr so command output on stdout stays parseable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = TrainerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Train {
            model_path,
            seed,
            live,
        } => {
            if let Some(path) = model_path {
                config.model.path = path;
            }
            if seed.is_some() {
                config.training.seed = seed;
            }
            config.publish.live |= live;
            train(&config, cli.format).await
        }
        Commands::Predict {
            timestamp,
            service,
            model,
        } => {
            let store = ModelStore::new(model.unwrap_or_else(|| config.model.path.clone()));
            let classifier = store
                .load()
                .with_context(|| format!("Failed to load model from {}", store.path().display()))?;

            let builder =
                FeatureBuilder::with_services(config.training.brute_force_services.iter().cloned());
            let record = AttackRecord {
                timestamp: Some(EventTime::Text(timestamp)),
                service: Some(service),
                attack_type: None,
            };
            let features = builder.extract(0, &record)?;
            let prediction = classifier.predict(&features)?;
            output::print_prediction(&prediction, cli.format)
        }
        Commands::Inspect { model } => {
            let store = ModelStore::new(model.unwrap_or_else(|| config.model.path.clone()));
            let classifier = store
                .load()
                .with_context(|| format!("Failed to load model from {}", store.path().display()))?;
            let artifact = store.artifact_info()?;
            output::print_model(&classifier, &artifact, cli.format)
        }
    }
}

async fn train(config: &TrainerConfig, format: OutputFormat) -> Result<()> {
    let pipeline = TrainingPipeline::new(config.pipeline_config());
    info!(run_id = %pipeline.run_id(), "Starting attack-trainer");

    let sink = ElasticsearchClient::new(&config.index.endpoint)?;
    let database_url = config.database.connection_url()?;
    let mut source = PgAttackSource::connect(&database_url)
        .await
        .context("Failed to connect to attack database")?;

    let result = pipeline.run(&mut source, &sink).await;
    source.close().await;

    let report = result.context("Training run failed")?;
    output::print_report(&report, format)
}
