use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::eval::ExecutionMode;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Local,
    Parallel,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Local => ExecutionMode::Local,
            ModeArg::Parallel => ExecutionMode::Parallel,
        }
    }
}

// Define command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the evaluation configuration YAML file.
    #[arg(short = 'c', long, default_value = "config/eval_config.yaml")]
    pub config: PathBuf,

    /// Path to the JSON Lines file with one raw example per line.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Overrides the execution mode from the config file
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Overrides the number of partitions per slice (parallel mode)
    #[arg(long)]
    pub partitions: Option<usize>,

    /// Overrides the worker thread count (parallel mode)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Print the Prometheus counters to stderr after the run
    #[arg(long)]
    pub dump_metrics: bool,

    /// Validate the evaluation configuration and exit
    #[arg(long)]
    pub validate_config: bool,
}
