//! Insight modeling engine - command-line driver
//!
//! Runs a saved model configuration against the modeling service, or works
//! offline on saved results (chart projection, baseline comparison).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use insight_common::config::EngineConfig;
use insight_common::{NoticeBus, NoticeLevel};
use insight_modeling::backend::{EntityId, HttpBackend};
use insight_modeling::comparison;
use insight_modeling::configuration::{ModelConfig, ModelType};
use insight_modeling::projector::ResultProjector;
use insight_modeling::result::{self, Horizon, ModelResult};
use insight_modeling::{ModelingSession, RunDisposition, SessionSettings};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{error, info, warn};

/// Command-line arguments for insight-modeling
#[derive(Parser, Debug)]
#[command(name = "insight-modeling")]
#[command(about = "Model configuration and evaluation engine for the Insight workbench")]
#[command(version)]
struct Args {
    /// Config file (overrides INSIGHT_CONFIG and the platform default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a configuration on the modeling service and print its charts
    Run {
        #[arg(long)]
        project: String,
        #[arg(long)]
        dataset: String,
        /// Model configuration JSON file
        #[arg(long = "config-json")]
        config_json: PathBuf,
        /// Follow-up horizon for survival evaluation (default: smallest available)
        #[arg(long)]
        horizon: Option<String>,
    },
    /// Project a saved result into chart series
    Project {
        #[arg(long = "result")]
        result_file: PathBuf,
        #[arg(long, default_value = "logistic")]
        model_type: ModelType,
        #[arg(long)]
        horizon: Option<String>,
    },
    /// Compare a saved baseline result against another saved result
    Compare {
        #[arg(long)]
        baseline: PathBuf,
        #[arg(long)]
        current: PathBuf,
        #[arg(long)]
        horizon: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    insight_common::logging::init(&config.logging).context("Failed to initialize logging")?;

    match args.command {
        Command::Run {
            project,
            dataset,
            config_json,
            horizon,
        } => run(&config, project, dataset, &config_json, horizon).await,
        Command::Project {
            result_file,
            model_type,
            horizon,
        } => {
            let fitted: ModelResult = read_json(&result_file)?;
            let horizon = horizon
                .map(Horizon::new)
                .or_else(|| result::available_horizons(&fitted).into_iter().next());
            let model_config = ModelConfig {
                model_type,
                ..Default::default()
            };
            let charts = ResultProjector::new(config.collinearity.vif_threshold).project(
                &fitted,
                &model_config,
                horizon.as_ref(),
            );
            print_json(&charts)
        }
        Command::Compare {
            baseline,
            current,
            horizon,
        } => {
            let first: ModelResult = read_json(&baseline)?;
            let second: ModelResult = read_json(&current)?;
            let horizon = horizon
                .map(Horizon::new)
                .or_else(|| result::available_horizons(&second).into_iter().next());
            let report = comparison::compare(&comparison::snapshot(&first), &second, horizon.as_ref());
            print_json(&report)
        }
    }
}

async fn run(
    config: &EngineConfig,
    project: String,
    dataset: String,
    config_json: &Path,
    horizon: Option<String>,
) -> Result<()> {
    let model_config: ModelConfig = read_json(config_json)?;
    let backend = HttpBackend::from_config(&config.backend).context("Failed to build HTTP client")?;
    info!(base_url = %backend.context().base_url, "Using modeling service");

    let notices = NoticeBus::new(config.notices.capacity);
    let mut rx = notices.subscribe();

    let session = ModelingSession::new(
        Arc::new(backend),
        notices,
        EntityId::from(project),
        SessionSettings::from_config(config),
    );
    session.set_dataset(Some(EntityId::from(dataset)));
    session.load_config(model_config);
    if let Some(h) = horizon {
        session.set_horizon(Some(Horizon::new(h)));
    }

    let disposition = session.run().await;

    loop {
        match rx.try_recv() {
            Ok(notice) => match notice.level {
                NoticeLevel::Error => error!("{}", notice.message),
                NoticeLevel::Warning => warn!("{}", notice.message),
                _ => info!("{}", notice.message),
            },
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }

    if disposition != RunDisposition::Applied {
        bail!("Model run did not produce a result ({:?})", disposition);
    }
    print_json(&session.charts())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
