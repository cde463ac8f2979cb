// src/config.rs

pub mod cli;
pub mod eval;

pub use eval::{
    load_eval_config, EvalConfig, ExampleCountParams, ExecutionConfig, ExecutionMode,
    MetricConfig,
};
