use clap::Parser;
use std::io::Write;
use tempfile::NamedTempFile;

use MetricBlaster::config::cli::{Args, ModeArg};
use MetricBlaster::config::{load_eval_config, ExecutionMode};
use MetricBlaster::data_model::{MetricKey, NormalizedInput, SliceKey};
use MetricBlaster::error::{MetricError, Result};
use MetricBlaster::evaluator::{evaluate_with_execution, Evaluator};
use MetricBlaster::pipeline::readers::{BaseReader, JsonlReader};

const RECORDS: &str = r#"
{"labels": 1, "predictions": 0.9, "example_weights": {"model": {"output": [0.0]}}, "features": {"language": "da", "source": "web"}}
{"labels": 0, "predictions": 0.2, "example_weights": {"model": {"output": [0.5]}}, "features": {"language": "da", "source": "news"}}
{"labels": 1, "predictions": 0.6, "example_weights": {"model": {"output": [1.0]}}, "features": {"language": "en", "source": "web"}}

{"labels": 0, "predictions": 0.4, "example_weights": {"model": {"output": [0.7]}}, "features": {"language": ["en", "da"]}}
"#;

const CONFIG: &str = r#"
model_names: [model]
output_names: [output]
metrics:
  - type: ExampleCount
  - type: ExampleCount
    example_weighted: true
slicing_specs:
  - {}
  - columns: [language]
  - feature_values:
      source: web
"#;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    write!(file, "{}", content).expect("Failed to write temp file");
    file
}

fn read_inputs(file: &NamedTempFile) -> Result<Vec<NormalizedInput>> {
    JsonlReader::new(file.path()).read_inputs()?.collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "got {}, expected {}",
        actual,
        expected
    );
}

#[test]
fn test_full_pipeline_local_and_parallel_agree() -> Result<()> {
    let records = write_temp(RECORDS);
    let config_file = write_temp(CONFIG);

    let inputs = read_inputs(&records)?;
    assert_eq!(inputs.len(), 4);

    let mut config = load_eval_config(config_file.path())?;
    let evaluator = Evaluator::from_config(&config)?;
    assert_eq!(evaluator.computations().len(), 2);

    let local = evaluate_with_execution(&evaluator, &config.execution, &inputs)?;

    config.execution.mode = ExecutionMode::Parallel;
    config.execution.num_partitions = 3;
    config.execution.num_threads = Some(2);
    let parallel = evaluate_with_execution(&evaluator, &config.execution, &inputs)?;

    let unweighted = MetricKey::new("example_count", "model", "output", false);
    let weighted = MetricKey::new("example_count", "model", "output", true);

    for results in [&local, &parallel] {
        // Overall, language:da, language:en, source:web
        assert_eq!(results.len(), 4);

        let overall = &results[&SliceKey::overall()];
        assert_eq!(overall[&unweighted], 4.0);
        assert_close(overall[&weighted], 2.2);

        let da = &results[&SliceKey::from_pairs([("language", "da")])];
        assert_eq!(da[&unweighted], 3.0);
        assert_close(da[&weighted], 1.2);

        let en = &results[&SliceKey::from_pairs([("language", "en")])];
        assert_eq!(en[&unweighted], 2.0);
        assert_close(en[&weighted], 1.7);

        let web = &results[&SliceKey::from_pairs([("source", "web")])];
        assert_eq!(web[&unweighted], 2.0);
        assert_close(web[&weighted], 1.0);
    }
    Ok(())
}

#[test]
fn test_full_pipeline_surfaces_malformed_weights() -> Result<()> {
    // Second record is nested under the wrong output name.
    let records = write_temp(
        r#"{"example_weights": {"model": {"output": [1.0]}}}
{"example_weights": {"model": {"logits": [1.0]}}}
"#,
    );
    let config_file = write_temp(CONFIG);
    let inputs = read_inputs(&records)?;
    let config = load_eval_config(config_file.path())?;
    let evaluator = Evaluator::from_config(&config)?;

    let err = evaluate_with_execution(&evaluator, &config.execution, &inputs).unwrap_err();
    match err {
        MetricError::CombinerError { source, .. } => {
            assert!(matches!(
                *source,
                MetricError::MissingWeightKey { level: "output", .. }
            ));
        }
        other => panic!("Expected CombinerError, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_cli_args_parse() {
    let args = Args::try_parse_from([
        "evaluate",
        "--config",
        "eval.yaml",
        "--input",
        "records.jsonl",
        "--mode",
        "parallel",
        "--partitions",
        "16",
        "--dump-metrics",
    ])
    .expect("args should parse");
    assert_eq!(args.config.to_str(), Some("eval.yaml"));
    assert_eq!(args.mode, Some(ModeArg::Parallel));
    assert_eq!(args.partitions, Some(16));
    assert_eq!(args.threads, None);
    assert!(args.dump_metrics);
    assert!(!args.validate_config);
    assert_eq!(ExecutionMode::from(ModeArg::Parallel), ExecutionMode::Parallel);
}
