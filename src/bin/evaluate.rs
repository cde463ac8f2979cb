// src/bin/evaluate.rs

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use MetricBlaster::config::cli::Args;
use MetricBlaster::config::load_eval_config;
use MetricBlaster::data_model::NormalizedInput;
use MetricBlaster::evaluator::{evaluate_with_execution, Evaluator};
use MetricBlaster::pipeline::readers::{BaseReader, JsonlReader};
use MetricBlaster::utils::gather_metrics_text;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing subscriber
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")); // Default to info if RUST_LOG is not set
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Loading eval configuration from: {}", args.config.display());
    let mut config = load_eval_config(&args.config)?;

    // CLI flags take precedence over the file
    if let Some(mode) = args.mode {
        config.execution.mode = mode.into();
    }
    if let Some(partitions) = args.partitions {
        config.execution.num_partitions = partitions;
    }
    if let Some(threads) = args.threads {
        config.execution.num_threads = Some(threads);
    }

    if let Err(e) = config.validate() {
        error!("Configuration is invalid: {}", e);
        return Err(e.into());
    }
    if args.validate_config {
        info!("Configuration is valid.");
        return Ok(());
    }

    let input_path = args
        .input
        .context("--input is required unless --validate-config is set")?;
    let reader = JsonlReader::new(&input_path);
    let inputs: Vec<NormalizedInput> = reader
        .read_inputs()?
        .collect::<MetricBlaster::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read inputs from '{}'", input_path.display()))?;
    info!("Read {} inputs.", inputs.len());
    if inputs.is_empty() {
        warn!("No inputs read; every slice will be empty.");
    }

    let evaluator = Evaluator::from_config(&config)?;
    let results = evaluate_with_execution(&evaluator, &config.execution, &inputs)?;

    for (slice_key, metrics) in &results {
        for (metric_key, value) in metrics {
            println!("{}\t{}\t{}", slice_key, metric_key, value);
        }
    }

    if args.dump_metrics {
        eprintln!("{}", gather_metrics_text()?);
    }
    Ok(())
}
