// src/pipeline/readers/jsonl_reader.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::data_model::NormalizedInput;
use crate::error::{MetricError, Result};
use crate::pipeline::readers::BaseReader;
use crate::pipeline::standardize::{to_standard_metric_inputs, RawExample};

/// Reads raw examples from a JSON Lines file, one record per non-blank line,
/// and standardizes each one.
#[derive(Debug, Clone)]
pub struct JsonlReader {
    path: PathBuf,
}

impl JsonlReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonlReader {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_line(line_number: usize, line: &str) -> Result<NormalizedInput> {
    let raw: RawExample =
        serde_json::from_str(line).map_err(|e| MetricError::InputParseError {
            line: line_number,
            reason: e.to_string(),
        })?;
    to_standard_metric_inputs(raw).map_err(|e| MetricError::InputParseError {
        line: line_number,
        reason: e.to_string(),
    })
}

impl BaseReader for JsonlReader {
    fn read_inputs(&self) -> Result<Box<dyn Iterator<Item = Result<NormalizedInput>>>> {
        let file = File::open(&self.path)?;
        info!("Reading inputs from {}", self.path.display());

        let iterator = BufReader::new(file)
            .lines()
            .enumerate()
            .filter_map(|(idx, line_result)| {
                let line_number = idx + 1;
                match line_result {
                    Ok(line) if line.trim().is_empty() => {
                        debug!(line = line_number, "Skipping blank line");
                        None
                    }
                    Ok(line) => Some(parse_line(line_number, &line)),
                    Err(e) => Some(Err(MetricError::from(e))),
                }
            });

        Ok(Box::new(iterator))
    }
}
