use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, MetricError>;

/// The Error type for metric evaluation.
#[derive(Error, Debug)]
pub enum MetricError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidationError(String),

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization/Deserialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Input record {line} could not be parsed: {reason}")]
    InputParseError { line: usize, reason: String },

    /// A configured model or output name has no entry in `example_weights`.
    #[error("Example weights have no entry for {level} '{key}'")]
    MissingWeightKey { level: &'static str, key: String },

    #[error("Example weights are missing but the metric is example weighted")]
    MissingExampleWeights,

    #[error("Example weights sequence is empty")]
    EmptyExampleWeights,

    #[error("Example weights shape mismatch: expected {expected}, found {found}")]
    WeightShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Error in combiner '{combiner_name}': {source}")]
    CombinerError {
        combiner_name: String,
        source: Box<MetricError>,
    },

    #[error("Executor error: {0}")]
    ExecutorError(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<rayon::ThreadPoolBuildError> for MetricError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        MetricError::ExecutorError(err.to_string())
    }
}
