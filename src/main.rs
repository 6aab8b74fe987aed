use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use engagement_lab::config::AgentConfig;
use engagement_lab::experiment::{
    ExperimentManager, ExperimentRequest, ExperimentResponse, SimulatedMetricsSource,
};
use engagement_lab::kv::MemoryKvStore;
use engagement_lab::notify::MemorySink;
use engagement_lab::retention::{
    synthetic, ModelArtifact, RetentionPredictor, RetentionRequest, RetentionResponse,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A/B winner selection and retention prediction for short-form content
#[derive(Parser, Debug)]
#[command(name = "engagement-lab", version, about)]
struct Cli {
    /// Log at debug level to stderr (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an experiment request (`create` or `analyze`)
    Experiment {
        /// Request JSON file, or `-` for stdin
        request: PathBuf,

        /// After `create`, analyze the new experiment with simulated metrics
        #[arg(long)]
        analyze: bool,

        /// Seed for variant generation and simulated metrics
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run a retention request (`predict`, `viral_score`, `update_model`)
    Retention {
        /// Request JSON file, or `-` for stdin
        request: PathBuf,

        /// Model artifact path
        #[arg(long, env = "MODEL_PATH")]
        model: Option<PathBuf>,
    },

    /// Train a model on synthetic data and save it
    Train {
        /// Where to write the artifact
        #[arg(long, env = "MODEL_PATH")]
        output: Option<PathBuf>,

        /// Synthetic rows to generate
        #[arg(long, default_value_t = 1000)]
        samples: usize,

        /// Generator seed
        #[arg(long, default_value_t = synthetic::DEFAULT_SEED)]
        seed: u64,
    },
}

/// Initialize tracing subscriber for log output
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_request<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("Invalid request in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_experiment(
    config: AgentConfig,
    request: &Path,
    analyze: bool,
    seed: Option<u64>,
) -> Result<()> {
    let request: ExperimentRequest = read_request(request)?;
    let seed = seed.unwrap_or_else(rand::random);
    let manager = ExperimentManager::new(
        MemoryKvStore::new(),
        SimulatedMetricsSource::seeded(seed),
        MemorySink::new(),
    )
    .with_config(config.experiment)?
    .with_seed(seed);

    let response = manager.process(request).await?;
    print_json(&response)?;

    if let (true, ExperimentResponse::Created(created)) = (analyze, &response) {
        let analysis = manager.analyze_experiment(&created.experiment_id).await?;
        print_json(&analysis)?;
    }
    Ok(())
}

async fn run_retention(mut config: AgentConfig, request: &Path, model: Option<PathBuf>) -> Result<()> {
    let request: RetentionRequest = read_request(request)?;
    if let Some(model) = model {
        config.retention.model_path = model;
    }
    let model_path = config.retention.model_path.clone();
    let predictor = Arc::new(RetentionPredictor::new(MemoryKvStore::new(), config.retention)?);

    // A missing artifact is fine for a retrain; an unusable one never is.
    let loaded = predictor
        .load_model_if_present()
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

    let response = match request {
        RetentionRequest::UpdateModel { historical_data } => {
            let update = predictor.update_model_blocking(historical_data).await?;
            RetentionResponse::ModelUpdate(update)
        }
        other => {
            if !loaded {
                bail!(
                    "Cannot serve retention requests without a model at {} (run `engagement-lab train`)",
                    model_path.display()
                );
            }
            predictor.process(other).await?
        }
    };
    print_json(&response)
}

fn run_train(config: &AgentConfig, output: Option<PathBuf>, samples: usize, seed: u64) -> Result<()> {
    let output = output.unwrap_or_else(|| config.retention.model_path.clone());
    let artifact = ModelArtifact::bootstrap(samples, seed)?;
    artifact
        .save(&output)
        .with_context(|| format!("Failed to save model to {}", output.display()))?;
    info!(path = %output.display(), version = artifact.version(), "model ready");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = AgentConfig::from_env().context("Invalid configuration in environment")?;

    match cli.command {
        Command::Experiment {
            request,
            analyze,
            seed,
        } => run_experiment(config, &request, analyze, seed).await,
        Command::Retention { request, model } => run_retention(config, &request, model).await,
        Command::Train {
            output,
            samples,
            seed,
        } => run_train(&config, output, samples, seed),
    }
}
